//! Physicochemical properties for ligand components.
//!
//! Descriptors come from public chemistry APIs: the archive's chemical
//! component dictionary for SMILES/InChIKey/formula weight, then ChEMBL for
//! computed properties (ALogP, H-bond counts, rotatable bonds, TPSA, QED).
//! Lookups are best-effort — a component missing from either source keeps
//! `None` fields, and the drug-likeness falls back to a local rule-of-five
//! estimate.

use anyhow::Result;
use proteka_common::config::LipinskiThresholds;
use proteka_common::sandbox::SandboxClient as Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CHEMCOMP_URL: &str = "https://data.rcsb.org/rest/v1/core/chemcomp";
const CHEMBL_MOLECULE_URL: &str = "https://www.ebi.ac.uk/chembl/api/data/molecule";

/// Computed descriptors for one ligand component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LigandProperties {
    pub smiles: Option<String>,
    pub inchi_key: Option<String>,
    pub molecular_weight: Option<f64>,
    pub logp: Option<f64>,
    pub h_donors: Option<i32>,
    pub h_acceptors: Option<i32>,
    pub rotatable_bonds: Option<i32>,
    pub tpsa: Option<f64>,
    pub qed: Option<f64>,
}

#[derive(Deserialize)]
struct ChemCompResponse {
    chem_comp: Option<ChemCompCore>,
    rcsb_chem_comp_descriptor: Option<ChemCompDescriptor>,
}

#[derive(Deserialize)]
struct ChemCompCore {
    formula_weight: Option<f64>,
}

#[derive(Deserialize)]
struct ChemCompDescriptor {
    smiles: Option<String>,
    #[serde(rename = "in_ch_i_key")]
    inchi_key: Option<String>,
}

#[derive(Deserialize)]
struct ChemblMoleculeData {
    molecule_properties: Option<ChemblMoleculeProperties>,
}

// ChEMBL serializes most numeric properties as strings.
#[derive(Deserialize)]
struct ChemblMoleculeProperties {
    full_mwt: Option<String>,
    alogp: Option<String>,
    psa: Option<String>,
    hbd: Option<i32>,
    hba: Option<i32>,
    rtb: Option<i32>,
    qed_weighted: Option<String>,
}

/// Resolves ligand descriptors through the public chemistry APIs.
pub struct PropertyResolver {
    client: Client,
    lipinski: LipinskiThresholds,
}

impl PropertyResolver {
    pub fn new(lipinski: LipinskiThresholds) -> Result<Self> {
        Ok(Self {
            client: Client::new()?,
            lipinski,
        })
    }

    /// Resolve descriptors for one chemical component id (e.g. "STI").
    pub async fn resolve(&self, comp_id: &str) -> LigandProperties {
        let mut props = LigandProperties::default();

        match self.fetch_chemcomp(comp_id).await {
            Ok(Some((smiles, inchi_key, weight))) => {
                props.smiles = smiles;
                props.inchi_key = inchi_key;
                props.molecular_weight = weight;
            }
            Ok(None) => debug!("No chemical component entry for {}", comp_id),
            Err(e) => warn!("Chemical component lookup failed for {}: {}", comp_id, e),
        }

        if let Some(inchi_key) = props.inchi_key.clone() {
            match self.fetch_chembl(&inchi_key).await {
                Ok(Some(chembl)) => {
                    if props.molecular_weight.is_none() {
                        props.molecular_weight =
                            chembl.full_mwt.as_ref().and_then(|s| s.parse().ok());
                    }
                    props.logp = chembl.alogp.as_ref().and_then(|s| s.parse().ok());
                    props.tpsa = chembl.psa.as_ref().and_then(|s| s.parse().ok());
                    props.h_donors = chembl.hbd;
                    props.h_acceptors = chembl.hba;
                    props.rotatable_bonds = chembl.rtb;
                    props.qed = chembl.qed_weighted.as_ref().and_then(|s| s.parse().ok());
                }
                Ok(None) => debug!("ChEMBL has no molecule for {}", inchi_key),
                Err(e) => warn!("ChEMBL lookup failed for {}: {}", comp_id, e),
            }
        }

        // Local estimate when the remote score is missing but we have enough
        // descriptors for the rule-of-five count.
        if props.qed.is_none() {
            if let (Some(mw), Some(logp)) = (props.molecular_weight, props.logp) {
                let violations = lipinski_violations(
                    mw,
                    logp,
                    props.h_donors,
                    props.h_acceptors,
                    &self.lipinski,
                );
                props.qed = Some(qed_estimate(violations));
            }
        }

        props
    }

    async fn fetch_chemcomp(
        &self,
        comp_id: &str,
    ) -> Result<Option<(Option<String>, Option<String>, Option<f64>)>> {
        let url = format!("{}/{}", CHEMCOMP_URL, comp_id.to_uppercase());
        let resp = self.client.get(&url)?.send().await?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let body: ChemCompResponse = resp.json().await?;
        let weight = body.chem_comp.and_then(|c| c.formula_weight);
        let (smiles, inchi_key) = match body.rcsb_chem_comp_descriptor {
            Some(d) => (d.smiles, d.inchi_key),
            None => (None, None),
        };

        Ok(Some((smiles, inchi_key, weight)))
    }

    async fn fetch_chembl(&self, inchi_key: &str) -> Result<Option<ChemblMoleculeProperties>> {
        let url = format!("{}/{}?format=json", CHEMBL_MOLECULE_URL, inchi_key);
        let resp = self.client.get(&url)?.send().await?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let body: ChemblMoleculeData = resp.json().await?;
        Ok(body.molecule_properties)
    }
}

/// Count of Lipinski rule-of-five violations.
pub fn lipinski_violations(
    mw: f64,
    logp: f64,
    hbd: Option<i32>,
    hba: Option<i32>,
    thresholds: &LipinskiThresholds,
) -> u32 {
    let mut violations = 0;
    if mw > thresholds.mw_max {
        violations += 1;
    }
    if logp > thresholds.logp_max {
        violations += 1;
    }
    if let Some(hbd) = hbd {
        if hbd > thresholds.hbd_max {
            violations += 1;
        }
    }
    if let Some(hba) = hba {
        if hba > thresholds.hba_max {
            violations += 1;
        }
    }
    violations
}

/// Coarse drug-likeness from the violation count, used only when the
/// remote QED is unavailable.
pub fn qed_estimate(violations: u32) -> f64 {
    1.0 - (violations as f64 * 0.2).min(0.8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lipinski_violation_count() {
        let t = LipinskiThresholds::default();
        assert_eq!(lipinski_violations(350.0, 2.1, Some(2), Some(5), &t), 0);
        assert_eq!(lipinski_violations(550.0, 2.1, Some(2), Some(5), &t), 1);
        assert_eq!(lipinski_violations(550.0, 6.0, Some(6), Some(11), &t), 4);
        // Unknown H-bond counts don't count as violations
        assert_eq!(lipinski_violations(550.0, 6.0, None, None, &t), 2);
    }

    #[test]
    fn test_qed_estimate_bounds() {
        assert!((qed_estimate(0) - 1.0).abs() < 1e-9);
        assert!((qed_estimate(2) - 0.6).abs() < 1e-9);
        // Estimate floors at 0.2 no matter how many violations
        assert!((qed_estimate(4) - 0.2).abs() < 1e-9);
        assert!((qed_estimate(10) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_chembl_string_fields_parse() {
        let body: ChemblMoleculeData = serde_json::from_str(
            r#"{
                "molecule_properties": {
                    "full_mwt": "493.60",
                    "alogp": "3.73",
                    "psa": "86.28",
                    "hbd": 2,
                    "hba": 7,
                    "rtb": 7,
                    "qed_weighted": "0.39"
                }
            }"#,
        )
        .unwrap();

        let props = body.molecule_properties.unwrap();
        assert_eq!(props.full_mwt.as_deref().and_then(|s| s.parse::<f64>().ok()), Some(493.6));
        assert_eq!(props.hbd, Some(2));
        assert_eq!(props.qed_weighted.as_deref().and_then(|s| s.parse::<f64>().ok()), Some(0.39));
    }
}
