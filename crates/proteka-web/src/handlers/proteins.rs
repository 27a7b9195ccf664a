//! Protein list and detail — JSON API plus server-rendered pages.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
    Json,
};
use proteka_common::error::ApiError;
use proteka_db::models::{LigandRow, ProteinDetail, ProteinRow};
use serde::{Deserialize, Serialize};

use super::is_valid_accession;
use crate::handlers::dashboard::NAV_HTML;
use crate::state::SharedState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Deserialize, Default)]
pub struct ProteinFilter {
    pub category: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

// === API Types ===

#[derive(Debug, Serialize)]
pub struct ProteinListResponse {
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
    pub proteins: Vec<ProteinRow>,
}

#[derive(Debug, Serialize)]
pub struct ProteinDetailResponse {
    pub protein: ProteinDetail,
    pub ligands: Vec<LigandRow>,
}

// === API Endpoints ===

/// GET /api/proteins - List proteins with optional category filter
pub async fn api_proteins(
    State(state): State<SharedState>,
    Query(filter): Query<ProteinFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let offset = filter.offset.unwrap_or(0).max(0);
    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let (proteins, total) = state
        .repo
        .list_proteins(filter.category.as_deref(), offset, limit)
        .await?;

    Ok(Json(ProteinListResponse {
        total,
        offset,
        limit,
        proteins,
    }))
}

/// GET /api/proteins/:pdb_id - One protein with categories and ligands
pub async fn api_protein_detail(
    State(state): State<SharedState>,
    Path(pdb_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_accession(&pdb_id) {
        return Err(ApiError::BadRequest(format!(
            "malformed accession: {}",
            pdb_id
        )));
    }

    let detail = state
        .repo
        .get_protein(&pdb_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("protein {} not found", pdb_id.to_uppercase())))?;

    let ligands = state.repo.ligands_for_protein(detail.protein.id).await?;

    Ok(Json(ProteinDetailResponse {
        protein: detail,
        ligands,
    }))
}

// === Pages ===

pub async fn proteins_page(
    State(state): State<SharedState>,
    Query(filter): Query<ProteinFilter>,
) -> Html<String> {
    let per_page = 25i64;
    let page = filter.page.unwrap_or(0).max(0);
    let category = filter.category.as_deref().unwrap_or("");

    let (rows, total) = state
        .repo
        .list_proteins(
            filter.category.as_deref().filter(|c| !c.is_empty()),
            page * per_page,
            per_page,
        )
        .await
        .unwrap_or_default();

    let rows_html: String = if rows.is_empty() {
        r#"<tr><td colspan="7" class="text-center text-muted py-4">
            No structures yet. Run the ingestion pipeline to populate the archive.
        </td></tr>"#
            .to_string()
    } else {
        rows.iter()
            .map(|p| {
                let quality_class = match p.quality.as_str() {
                    "high_quality" => "success",
                    "medium_quality" => "warning",
                    _ => "muted",
                };
                let resolution = p
                    .resolution
                    .map(|r| format!("{:.2} Å", r))
                    .unwrap_or_else(|| "—".to_string());
                format!(
                    r#"<tr>
                <td><a href="/proteins/{pdb}" class="fw-bold">{pdb}</a></td>
                <td class="title-cell" title="{title}">{title}</td>
                <td>{resolution}</td>
                <td><span class="badge badge-{quality_class}">{quality}</span></td>
                <td>{chains}</td>
                <td class="text-muted small">{method}</td>
                <td><a href="/proteins/{pdb}" class="btn btn-outline btn-sm">Detail</a></td>
            </tr>"#,
                    pdb = p.pdb_id,
                    title = p.title.as_deref().unwrap_or("(untitled)"),
                    resolution = resolution,
                    quality_class = quality_class,
                    quality = p.quality,
                    chains = p.num_chains,
                    method = p.experiment_type.as_deref().unwrap_or("—"),
                )
            })
            .collect()
    };

    let pagination = if total > per_page {
        let pages = (total + per_page - 1) / per_page;
        let btns: String = (0..pages)
            .map(|p| {
                format!(
                    r#"<a href="/proteins?category={}&page={}" class="btn btn-sm {}">{}</a>"#,
                    category,
                    p,
                    if p == page { "btn-primary" } else { "btn-outline" },
                    p + 1
                )
            })
            .collect();
        format!(r#"<div class="pagination">{}</div>"#, btns)
    } else {
        String::new()
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Proteins — Proteka</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<div class="app-container">
{nav}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">Protein Structures</h1>
            <p class="text-muted">{total} structures in the archive</p>
        </div>
    </div>

    <form class="filter-bar" method="GET" action="/proteins">
        <input type="text" name="category" class="form-control"
               placeholder="Filter by category (e.g. kinase)..." value="{category}">
        <button type="submit" class="btn btn-primary">Filter</button>
    </form>

    <div class="card">
        <div class="table-container">
            <table class="table">
                <thead>
                    <tr>
                        <th>Accession</th>
                        <th>Title</th>
                        <th>Resolution</th>
                        <th>Quality</th>
                        <th>Chains</th>
                        <th>Method</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
    </div>
    {pagination}
</main>
</div>
</body>
</html>"#,
        nav = NAV_HTML,
        total = total,
        category = category,
        rows = rows_html,
        pagination = pagination,
    ))
}

pub async fn protein_detail_page(
    State(state): State<SharedState>,
    Path(pdb_id): Path<String>,
) -> Html<String> {
    let detail = match state.repo.get_protein(&pdb_id).await {
        Ok(Some(d)) => d,
        _ => {
            return Html(format!(
                r#"<!DOCTYPE html><html><head><title>Not found — Proteka</title>
<link rel="stylesheet" href="/static/css/main.css"></head>
<body><div class="app-container">{}<main class="main-content">
<h1 class="page-title">Structure not found</h1>
<p class="text-muted">No structure with accession {} in the archive.</p>
<a href="/proteins" class="btn btn-primary">Back to list</a>
</main></div></body></html>"#,
                NAV_HTML,
                pdb_id.to_uppercase()
            ));
        }
    };

    let ligands = state
        .repo
        .ligands_for_protein(detail.protein.id)
        .await
        .unwrap_or_default();
    let integrity = state
        .repo
        .get_integrity("protein_document", &pdb_id)
        .await
        .unwrap_or(None);

    let p = &detail.protein;
    let categories_html: String = if detail.categories.is_empty() {
        r#"<span class="text-muted">uncategorized</span>"#.to_string()
    } else {
        detail
            .categories
            .iter()
            .map(|c| {
                format!(
                    r#"<a href="/proteins?category={name}" class="badge badge-outline">{name}</a> "#,
                    name = c.name
                )
            })
            .collect()
    };

    let chains_html: String = p
        .chain_data
        .as_object()
        .map(|chains| {
            chains
                .iter()
                .map(|(id, info)| {
                    format!(
                        r#"<tr><td class="fw-bold">{}</td><td>{}</td><td>{}</td></tr>"#,
                        id,
                        info["length"].as_u64().unwrap_or(0),
                        info["residue_range"].as_str().unwrap_or("—"),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let ligands_html: String = if ligands.is_empty() {
        r#"<p class="text-muted">No ligand candidates extracted from this structure.</p>"#
            .to_string()
    } else {
        ligands.iter().map(render_ligand_card).collect()
    };

    let integrity_html = match integrity {
        Some(row) => format!(
            r#"<div class="card">
        <div class="card-header">Provenance</div>
        <p class="mono small">sha256: {}</p>
        <p class="mono small">ipfs: {}</p>
        <p class="mono small">chain tx: {} ({})</p>
    </div>"#,
            row.sha256,
            row.ipfs_hash.as_deref().unwrap_or("—"),
            row.chain_tx.as_deref().unwrap_or("—"),
            row.chain_status,
        ),
        None => format!(
            r#"<div class="card">
        <div class="card-header">Provenance</div>
        <p class="text-muted">Not yet published.</p>
        <button class="btn btn-outline" onclick="publishProtein('{}')">Publish to IPFS</button>
    </div>"#,
            p.pdb_id
        ),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{pdb} — Proteka</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<div class="app-container">
{nav}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">{pdb}</h1>
            <p class="text-muted">{title}</p>
        </div>
        <span class="badge badge-{quality_class}">{quality}</span>
    </div>

    <div class="grid-2">
        <div class="card">
            <div class="card-header">Structure</div>
            <table class="table kv-table">
                <tr><td>Resolution</td><td>{resolution}</td></tr>
                <tr><td>Method</td><td>{method}</td></tr>
                <tr><td>Deposited</td><td>{deposited}</td></tr>
                <tr><td>Status</td><td>{status}</td></tr>
                <tr><td>Categories</td><td>{categories}</td></tr>
            </table>
        </div>
        <div class="card">
            <div class="card-header">Chains ({chain_count})</div>
            <div class="table-container">
                <table class="table">
                    <thead><tr><th>Chain</th><th>Length</th><th>Range</th></tr></thead>
                    <tbody>{chains}</tbody>
                </table>
            </div>
        </div>
    </div>

    <h2 class="section-title">Ligands ({ligand_count})</h2>
    {ligands}

    {integrity}
</main>
<script src="/static/js/main.js"></script>
</div>
</body>
</html>"#,
        nav = NAV_HTML,
        pdb = p.pdb_id,
        title = p.title.as_deref().unwrap_or("(untitled)"),
        quality_class = match p.quality.as_str() {
            "high_quality" => "success",
            "medium_quality" => "warning",
            _ => "muted",
        },
        quality = p.quality,
        resolution = p
            .resolution
            .map(|r| format!("{:.2} Å", r))
            .unwrap_or_else(|| "—".to_string()),
        method = p.experiment_type.as_deref().unwrap_or("—"),
        deposited = p
            .deposition_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "—".to_string()),
        status = p.status,
        categories = categories_html,
        chain_count = p.num_chains,
        chains = chains_html,
        ligand_count = ligands.len(),
        ligands = ligands_html,
        integrity = integrity_html,
    ))
}

fn render_ligand_card(l: &LigandRow) -> String {
    let prop = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "—".to_string());
    let iprop = |v: Option<i32>| v.map(|x| x.to_string()).unwrap_or_else(|| "—".to_string());

    let binding_html = l
        .binding_site
        .as_ref()
        .map(|site| {
            let n = site["num_binding_residues"].as_u64().unwrap_or(0);
            let avg = site["avg_distance"]
                .as_f64()
                .map(|d| format!("{:.2} Å", d))
                .unwrap_or_else(|| "—".to_string());
            let polarity = site["pocket_polarity"].as_f64().unwrap_or(0.0);
            format!(
                r#"<div class="binding-site small">
            {} binding residues · avg distance {} · polarity {:.2}
        </div>"#,
                n, avg, polarity
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="card ligand-card">
        <div class="card-header">
            <div>{name} <span class="text-muted">chain {chain}, residue {seq}</span></div>
            <span class="text-muted small">{atoms} atoms</span>
        </div>
        <div class="prop-grid">
            <div>MW <strong>{mw}</strong></div>
            <div>LogP <strong>{logp}</strong></div>
            <div>HBD <strong>{hbd}</strong></div>
            <div>HBA <strong>{hba}</strong></div>
            <div>RotB <strong>{rotb}</strong></div>
            <div>TPSA <strong>{tpsa}</strong></div>
            <div>QED <strong>{qed}</strong></div>
        </div>
        {binding}
    </div>"#,
        name = l.residue_name,
        chain = l.chain_id,
        seq = l.residue_seq,
        atoms = l.num_atoms,
        mw = prop(l.molecular_weight),
        logp = prop(l.logp),
        hbd = iprop(l.h_donors),
        hba = iprop(l.h_acceptors),
        rotb = iprop(l.rotatable_bonds),
        tpsa = prop(l.tpsa),
        qed = prop(l.qed),
        binding = binding_html,
    )
}
