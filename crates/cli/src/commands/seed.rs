use xsell_db::DemoCatalog;

use crate::commands::{open_database, prepare, CommandResult, Failure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seeded = DemoCatalog::load_into(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoCatalog::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        if !verification.all_present {
            let failed = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            return Err(("seed_verification", verification_message(&failed), 6u8));
        }
        Ok::<_, Failure>(seeded)
    });

    match result {
        Ok(seeded) => CommandResult::success_with_data(
            "seed",
            format!(
                "demo catalog loaded: {} products, {} custom fields, {} rules",
                seeded.products_seeded, seeded.custom_fields_seeded, seeded.rules_seeded
            ),
            serde_json::to_value(seeded).ok(),
        ),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_message;

    #[test]
    fn verification_message_names_missing_rows() {
        assert_eq!(
            verification_message(&["lamp-wall", "socket"]),
            "Seed verification failed for checks: lamp-wall, socket"
        );
        assert_eq!(verification_message(&[]), "Some seed data failed to load");
    }
}
