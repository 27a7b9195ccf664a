//! Dashboard handler — landing page with archive overview.

use axum::{extract::State, response::Html};
use proteka_db::models::{CategoryWithCount, ProteinRow, StatsSummary};

use crate::state::SharedState;

/// Navigation HTML shared across all pages.
pub const NAV_HTML: &str = include_str!("../../templates/nav.html");

pub async fn dashboard(State(state): State<SharedState>) -> Html<String> {
    let stats = state.repo.stats().await.unwrap_or(StatsSummary {
        protein_count: 0,
        ligand_count: 0,
        category_count: 0,
        last_updated: None,
    });
    let categories = state.repo.list_categories().await.unwrap_or_default();
    let (recent, _) = state.repo.list_proteins(None, 0, 8).await.unwrap_or_default();

    Html(render_dashboard(stats, categories, recent))
}

fn render_dashboard(
    stats: StatsSummary,
    categories: Vec<CategoryWithCount>,
    recent: Vec<ProteinRow>,
) -> String {
    let max_count = categories
        .iter()
        .map(|c| c.protein_count)
        .max()
        .unwrap_or(0)
        .max(1);

    let categories_html: String = if categories.is_empty() {
        r#"<p class="text-muted">No categories yet. Run the categorization phase.</p>"#.to_string()
    } else {
        categories
            .iter()
            .map(|c| {
                let pct = (c.protein_count * 100 / max_count) as u32;
                format!(
                    r#"<div class="bar-row">
                <a href="/proteins?category={name}" class="bar-label">{name}</a>
                <div class="bar-track"><div class="bar-fill" style="width:{pct}%"></div></div>
                <span class="bar-value">{count}</span>
            </div>"#,
                    name = c.name,
                    pct = pct,
                    count = c.protein_count,
                )
            })
            .collect()
    };

    let recent_html: String = if recent.is_empty() {
        r#"<tr><td colspan="4" class="text-center text-muted py-4">
            No structures imported yet.
        </td></tr>"#
            .to_string()
    } else {
        recent
            .iter()
            .map(|p| {
                format!(
                    r#"<tr>
                <td><a href="/proteins/{pdb}" class="fw-bold">{pdb}</a></td>
                <td class="title-cell">{title}</td>
                <td>{resolution}</td>
                <td><span class="badge badge-outline">{quality}</span></td>
            </tr>"#,
                    pdb = p.pdb_id,
                    title = p.title.as_deref().unwrap_or("(untitled)"),
                    resolution = p
                        .resolution
                        .map(|r| format!("{:.2} Å", r))
                        .unwrap_or_else(|| "—".to_string()),
                    quality = p.quality,
                )
            })
            .collect()
    };

    let last_updated = stats
        .last_updated
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Dashboard — Proteka</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<div class="app-container">
{nav}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">Structure Archive</h1>
            <p class="text-muted">Last updated {last_updated}</p>
        </div>
        <a href="/proteins" class="btn btn-primary">Browse Structures</a>
    </div>

    <div class="stats-grid">
        <div class="stat-card">
            <div class="stat-value" id="stat-proteins">{proteins}</div>
            <div class="stat-label">Protein Structures</div>
        </div>
        <div class="stat-card">
            <div class="stat-value" id="stat-ligands">{ligands}</div>
            <div class="stat-label">Ligand Candidates</div>
        </div>
        <div class="stat-card">
            <div class="stat-value" id="stat-categories">{category_count}</div>
            <div class="stat-label">Categories</div>
        </div>
    </div>

    <div class="grid-2">
        <div class="card">
            <div class="card-header">
                <div>Category Distribution</div>
            </div>
            {categories}
        </div>

        <div class="card">
            <div class="card-header">
                <div>Recent Structures</div>
                <a href="/proteins" class="btn btn-outline btn-sm">All</a>
            </div>
            <div class="table-container">
                <table class="table">
                    <thead>
                        <tr><th>Accession</th><th>Title</th><th>Resolution</th><th>Quality</th></tr>
                    </thead>
                    <tbody>{recent}</tbody>
                </table>
            </div>
        </div>
    </div>
</main>
<script src="/static/js/main.js"></script>
</div>
</body>
</html>"#,
        nav = NAV_HTML,
        last_updated = last_updated,
        proteins = stats.protein_count,
        ligands = stats.ligand_count,
        category_count = stats.category_count,
        categories = categories_html,
        recent = recent_html,
    )
}
