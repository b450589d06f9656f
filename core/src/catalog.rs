//! Email catalog: the static, read-only pool of decision items.
//!
//! The catalog is injected into the engine; it never changes during a
//! session. Template order is the order of the source file and is what
//! makes uniform selection reproducible for a given seed.

use crate::{
    error::{GameError, GameResult},
    types::{ChoiceId, EmailId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Placeholder substituted with the configured company name.
pub const COMPANY_PLACEHOLDER: &str = "{company}";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    DataBreach,
    DataQuality,
    Hr,
    Strategy,
    Gdpr,
    Misc,
    Budget,
}

/// Resource deltas of a single choice. Percent impacts are pre-clamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub description:         String,
    pub budget_impact:       i64,
    pub profit_impact:       i64,
    pub data_quality_impact: i32,
    pub reputation_impact:   i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    pub id:      ChoiceId,
    pub text:    String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailTemplate {
    pub id:                   EmailId,
    pub sender:               String,
    pub title:                String,
    pub body:                 String,
    pub category:             Category,
    pub is_urgent:            bool,
    pub minimum_reputation:   i32,
    pub maximum_data_quality: i32,
    pub choices:              Vec<Choice>,
}

impl EmailTemplate {
    /// Gate: reputation high enough and data quality low enough.
    pub fn is_eligible(&self, reputation: i32, data_quality: i32) -> bool {
        self.minimum_reputation <= reputation && self.maximum_data_quality >= data_quality
    }

    pub fn choice(&self, choice_id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    pub fn personalized_body(&self, company: &str) -> String {
        self.body.replace(COMPANY_PLACEHOLDER, company)
    }

    /// First line of the body, cut to 60 characters for inbox previews.
    pub fn preview(&self, company: &str) -> String {
        let body = self.personalized_body(company);
        let first_line = body.lines().next().unwrap_or_default();
        if first_line.chars().count() > 60 {
            let cut: String = first_line.chars().take(60).collect();
            format!("{cut}...")
        } else {
            first_line.to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    templates: Vec<EmailTemplate>,
}

#[derive(Debug, Clone)]
pub struct EmailCatalog {
    templates: Vec<EmailTemplate>,
    index:     HashMap<EmailId, usize>,
}

impl EmailCatalog {
    /// Build a catalog, rejecting anything that would break session invariants.
    pub fn from_templates(templates: Vec<EmailTemplate>) -> GameResult<Self> {
        let mut seen = HashSet::with_capacity(templates.len());
        for template in &templates {
            if !seen.insert(template.id.as_str()) {
                return Err(GameError::Catalog(format!("duplicate template id '{}'", template.id)));
            }
            if template.choices.is_empty() {
                return Err(GameError::Catalog(format!("template '{}' has no choices", template.id)));
            }
            let mut choice_ids = HashSet::new();
            for choice in &template.choices {
                if !choice_ids.insert(choice.id) {
                    return Err(GameError::Catalog(format!(
                        "template '{}' repeats choice id {}",
                        template.id, choice.id
                    )));
                }
            }
            for (name, value) in [
                ("minimum_reputation", template.minimum_reputation),
                ("maximum_data_quality", template.maximum_data_quality),
            ] {
                if !(0..=100).contains(&value) {
                    return Err(GameError::Catalog(format!(
                        "template '{}' has {name} {value} outside 0..=100",
                        template.id
                    )));
                }
            }
        }
        Ok(Self::indexed(templates))
    }

    fn indexed(templates: Vec<EmailTemplate>) -> Self {
        let index = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self { templates, index }
    }

    /// Load from a JSON file of the form `{ "templates": [...] }`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: CatalogFile = serde_json::from_str(&content)?;
        let catalog = Self::from_templates(file.templates)?;
        log::info!("Loaded {} email templates from {path}", catalog.len());
        Ok(catalog)
    }

    /// Load `{data_dir}/emails.json`.
    pub fn load_dir(data_dir: &str) -> anyhow::Result<Self> {
        Self::load(&format!("{data_dir}/emails.json"))
    }

    pub fn get(&self, id: &str) -> Option<&EmailTemplate> {
        self.index.get(id).map(|&i| &self.templates[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmailTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates currently unlocked by the given metrics and not in `exclude`,
    /// in catalog order.
    pub fn eligible_pool(
        &self,
        reputation:   i32,
        data_quality: i32,
        exclude:      &BTreeSet<EmailId>,
    ) -> Vec<&EmailTemplate> {
        self.templates
            .iter()
            .filter(|t| t.is_eligible(reputation, data_quality))
            .filter(|t| !exclude.contains(&t.id))
            .collect()
    }

    /// Small in-code catalog for tests and tooling.
    ///
    /// - `welcome`: regular, ungated, intended as the one-shot intro
    /// - `reg_a`..`reg_e`: regular, ungated
    /// - `reg_gated`: regular, needs reputation >= 80
    /// - `urgent_a`, `urgent_b`: urgent, ungated
    pub fn default_test() -> Self {
        let mut templates = vec![test_template("welcome", false, 0, 100, 0)];
        for (i, id) in ["reg_a", "reg_b", "reg_c", "reg_d", "reg_e"].into_iter().enumerate() {
            templates.push(test_template(id, false, 0, 100, i as i64));
        }
        templates.push(test_template("reg_gated", false, 80, 100, 9));
        templates.push(test_template("urgent_a", true, 0, 100, 3));
        templates.push(test_template("urgent_b", true, 0, 100, 4));
        Self::indexed(templates)
    }
}

/// Build a three-choice template whose choices cost, pay, and are neutral.
pub fn test_template(
    id:                   &str,
    is_urgent:            bool,
    minimum_reputation:   i32,
    maximum_data_quality: i32,
    salt:                 i64,
) -> EmailTemplate {
    EmailTemplate {
        id:                   id.to_string(),
        sender:               "test@governopoly.io".into(),
        title:                format!("Test email {id}"),
        body:                 format!("Message for {COMPANY_PLACEHOLDER} about {id}.\nSecond line."),
        category:             if is_urgent { Category::DataBreach } else { Category::Misc },
        is_urgent,
        minimum_reputation,
        maximum_data_quality,
        choices: vec![
            Choice {
                id: 1,
                text: "Invest".into(),
                outcome: Outcome {
                    description:         format!("Invested in {id}"),
                    budget_impact:       -100_000 - salt * 1_000,
                    profit_impact:       250_000,
                    data_quality_impact: 10,
                    reputation_impact:   5,
                },
            },
            Choice {
                id: 2,
                text: "Cut corners".into(),
                outcome: Outcome {
                    description:         format!("Cut corners on {id}"),
                    budget_impact:       50_000,
                    profit_impact:       -100_000,
                    data_quality_impact: -15,
                    reputation_impact:   -10,
                },
            },
            Choice {
                id: 3,
                text: "Do nothing".into(),
                outcome: Outcome {
                    description:         "Nothing changed".into(),
                    budget_impact:       0,
                    profit_impact:       0,
                    data_quality_impact: 0,
                    reputation_impact:   0,
                },
            },
        ],
    }
}
