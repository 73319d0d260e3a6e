use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use xsell_core::CrossSellingRule;
use xsell_db::repositories::SqlRuleRepository;

use crate::commands::{open_database, prepare, CommandResult, Failure};

/// Imports rules from a JSON file holding either one rule object or an array of
/// them. Every rule is validated before anything is written, and the rules are
/// written in a single transaction; existing ids are updated in place.
pub fn run(path: &Path) -> CommandResult {
    let rules = match read_rules(path) {
        Ok(rules) => rules,
        Err(error) => {
            return CommandResult::failure("import-rules", "input_validation", format!("{error:#}"), 2)
        }
    };

    let (config, runtime) = match prepare("import-rules") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repository = SqlRuleRepository::new(pool.clone());
        repository
            .save_all(&rules)
            .await
            .map_err(|error| ("db_write", format!("import rolled back: {error}"), 4u8))?;
        let imported: Vec<String> = rules.iter().map(|rule| rule.id.0.clone()).collect();
        pool.close().await;
        Ok::<_, Failure>(imported)
    });

    match result {
        Ok(imported) => CommandResult::success_with_data(
            "import-rules",
            format!("imported {} rule(s) from {}", imported.len(), path.display()),
            Some(serde_json::json!({ "ruleIds": imported })),
        ),
        Err(failure) => CommandResult::from_failure("import-rules", failure),
    }
}

fn read_rules(path: &Path) -> Result<Vec<CrossSellingRule>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read rules file `{}`", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("`{}` is not valid JSON", path.display()))?;

    let rules: Vec<CrossSellingRule> = if document.is_array() {
        serde_json::from_value(document)
    } else {
        serde_json::from_value(document).map(|rule| vec![rule])
    }
    .with_context(|| format!("`{}` does not contain cross-selling rules", path.display()))?;

    for rule in &rules {
        rule.validate().with_context(|| format!("rule `{}` is invalid", rule.id))?;
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::read_rules;

    #[test]
    fn single_objects_and_arrays_are_accepted() {
        let dir = tempfile::tempdir().expect("temp dir");
        let single = dir.path().join("single.json");
        let many = dir.path().join("many.json");
        fs::write(&single, r#"{ "id": "r-1", "name": "One" }"#).expect("write");
        fs::write(&many, r#"[{ "id": "r-1", "name": "One" }, { "id": "r-2", "name": "Two", "active": false }]"#)
            .expect("write");

        let single = read_rules(&single).expect("single rule");
        let many = read_rules(&many).expect("rule array");

        assert_eq!(single.len(), 1);
        assert!(single[0].active);
        assert_eq!(many.len(), 2);
        assert!(!many[1].active);
    }

    #[test]
    fn invalid_rules_are_reported_by_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        fs::write(&path, r#"[{ "id": "nameless", "name": "  " }]"#).expect("write");

        let error = read_rules(&path).expect_err("blank name");

        assert!(format!("{error:#}").contains("nameless"));
    }
}
