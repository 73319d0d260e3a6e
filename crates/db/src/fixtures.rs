use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use xsell_core::cross_sell::fields::{CustomFieldDefinition, FieldType};
use xsell_core::cross_sell::ports::RuleRepository;
use xsell_core::domain::product::{Dimensions, FieldValue, Product};
use xsell_core::domain::rule::{
    ConditionOperator, CrossSellingRule, MatchType, RuleCondition, RuleTargetCriteria,
};
use xsell_core::errors::ApplicationError;

use crate::connection::DbPool;
use crate::repositories::{
    CustomFieldRepository, ProductRepository, RepositoryError, SqlCustomFieldRepository,
    SqlProductRepository, SqlRuleRepository,
};

struct DemoProduct {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    socket: &'static str,
    price_cents: i64,
    dimensions_cm: Option<(i64, i64, i64)>,
}

/// Three lamps and two light bulbs. Running the active demo rule against an empty
/// association table links every lamp to every bulb.
const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        id: "lamp-desk",
        name: "Vintage Desk Lamp",
        category: "Lamps",
        socket: "E27",
        price_cents: 4990,
        dimensions_cm: Some((30, 45, 30)),
    },
    DemoProduct {
        id: "lamp-floor",
        name: "Arc Floor Lamp",
        category: "Lamps",
        socket: "E27",
        price_cents: 18900,
        dimensions_cm: Some((40, 180, 40)),
    },
    DemoProduct {
        id: "lamp-wall",
        name: "Brass Wall Sconce",
        category: "Lamps",
        socket: "E14",
        price_cents: 6500,
        dimensions_cm: None,
    },
    DemoProduct {
        id: "bulb-e27-led",
        name: "LED Bulb E27 9W",
        category: "LightBulbs",
        socket: "E27",
        price_cents: 599,
        dimensions_cm: None,
    },
    DemoProduct {
        id: "bulb-e14-halogen",
        name: "Halogen Bulb E14 40W",
        category: "LightBulbs",
        socket: "E14",
        price_cents: 349,
        dimensions_cm: None,
    },
];

const DEMO_RULE_IDS: &[&str] = &["lamps-need-bulbs", "socket-compatible-bulbs"];

const DEMO_CUSTOM_FIELDS: &[&str] = &["socket"];

pub struct DemoCatalog;

impl DemoCatalog {
    pub fn products() -> Vec<Product> {
        DEMO_PRODUCTS
            .iter()
            .map(|demo| {
                let mut product = Product::new(demo.id, demo.name)
                    .with_attribute("category", demo.category)
                    .with_attribute("socket", demo.socket)
                    .with_attribute("price", Decimal::new(demo.price_cents, 2))
                    .with_attribute("sku", demo.id.to_ascii_uppercase().as_str());
                if let Some((width, height, depth)) = demo.dimensions_cm {
                    product = product.with_attribute(
                        "dimensions",
                        Dimensions::new(Decimal::from(width), Decimal::from(height), Decimal::from(depth)),
                    );
                }
                if demo.category == "LightBulbs" {
                    product = product.with_attribute(
                        "tags",
                        FieldValue::List(vec!["bulb".to_owned(), demo.socket.to_ascii_lowercase()]),
                    );
                }
                product
            })
            .collect()
    }

    pub fn custom_fields() -> Vec<CustomFieldDefinition> {
        vec![CustomFieldDefinition::new("socket", "Socket", FieldType::Enum)]
    }

    /// The lamps-to-bulbs rule (active) and a stricter socket-matching variant that
    /// is stored inactive and only runs when requested by id.
    pub fn rules() -> Vec<CrossSellingRule> {
        let mut lamps = CrossSellingRule::new(DEMO_RULE_IDS[0], "Lamps need light bulbs")
            .with_condition(RuleCondition::new("category", ConditionOperator::Equals, json!("Lamps")))
            .with_criteria(RuleTargetCriteria::literal("category", MatchType::Exact, "LightBulbs"));
        lamps.description = Some("Offer every light bulb on every lamp page".to_owned());

        let sockets = CrossSellingRule::new(DEMO_RULE_IDS[1], "Bulbs that fit the lamp socket")
            .with_condition(RuleCondition::new("category", ConditionOperator::Equals, json!("Lamps")))
            .with_criteria(RuleTargetCriteria::literal("category", MatchType::Exact, "LightBulbs"))
            .with_criteria(RuleTargetCriteria::relative("socket", MatchType::SameProperty))
            .deactivated();

        vec![lamps, sockets]
    }

    /// Upserts the demo data through the given repositories. Safe to run repeatedly.
    pub async fn load(
        products: &dyn ProductRepository,
        custom_fields: &dyn CustomFieldRepository,
        rules: &dyn RuleRepository,
    ) -> Result<SeedResult, ApplicationError> {
        let demo_products = Self::products();
        let demo_fields = Self::custom_fields();
        let demo_rules = Self::rules();
        let result = SeedResult {
            products_seeded: demo_products.len(),
            custom_fields_seeded: demo_fields.len(),
            rules_seeded: demo_rules.len(),
        };

        for definition in demo_fields {
            custom_fields.save(definition).await?;
        }
        for product in demo_products {
            products.save(product).await?;
        }
        for rule in demo_rules {
            rules.save_rule(rule).await?;
        }

        info!(
            event_name = "fixtures.demo_loaded",
            products = result.products_seeded,
            custom_fields = result.custom_fields_seeded,
            rules = result.rules_seeded,
            "demo catalog loaded"
        );
        Ok(result)
    }

    pub async fn load_into(pool: &DbPool) -> Result<SeedResult, ApplicationError> {
        Self::load(
            &SqlProductRepository::new(pool.clone()),
            &SqlCustomFieldRepository::new(pool.clone()),
            &SqlRuleRepository::new(pool.clone()),
        )
        .await
    }

    /// Checks that every demo row is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for demo in DEMO_PRODUCTS {
            let present: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product WHERE id = ?1)")
                    .bind(demo.id)
                    .fetch_one(pool)
                    .await?;
            checks.push((demo.id, present == 1));
        }
        for rule_id in DEMO_RULE_IDS {
            let present: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cross_selling_rule WHERE id = ?1)")
                    .bind(rule_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((*rule_id, present == 1));
        }
        for field in DEMO_CUSTOM_FIELDS {
            let present: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM custom_field WHERE field = ?1)")
                    .bind(field)
                    .fetch_one(pool)
                    .await?;
            checks.push((*field, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo rows and every association touching a demo product.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let product_ids: Vec<&str> = DEMO_PRODUCTS.iter().map(|demo| demo.id).collect();
        let quoted_products = sql_array_from_ids(&product_ids);
        let quoted_rules = sql_array_from_ids(DEMO_RULE_IDS);
        let quoted_fields = sql_array_from_ids(DEMO_CUSTOM_FIELDS);

        let mut tx = pool.begin().await?;
        sqlx::query(&format!(
            "DELETE FROM cross_selling_association
             WHERE source_product_id IN {quoted_products} OR target_product_id IN {quoted_products}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM product WHERE id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM cross_selling_rule WHERE id IN {quoted_rules}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM custom_field WHERE field IN {quoted_fields}"))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub custom_fields_seeded: usize,
    pub rules_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn demo_catalog_has_three_lamps_and_two_bulbs() {
        let products = DemoCatalog::products();
        let lamps = products
            .iter()
            .filter(|p| p.attributes.get("category") == Some(&FieldValue::Text("Lamps".to_owned())))
            .count();

        assert_eq!(products.len(), 5);
        assert_eq!(lamps, 3);
        assert_eq!(DemoCatalog::rules().iter().filter(|rule| rule.active).count(), 1);
    }

    #[tokio::test]
    async fn seed_is_idempotent_and_cleanable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoCatalog::load_into(&pool).await.expect("load demo");
        let second = DemoCatalog::load_into(&pool).await.expect("reload demo");
        let verification = DemoCatalog::verify(&pool).await.expect("verify demo");

        assert_eq!(first, second);
        assert!(verification.all_present);
        assert_eq!(verification.checks.len(), DEMO_PRODUCTS.len() + DEMO_RULE_IDS.len() + 1);

        DemoCatalog::clean(&pool).await.expect("clean demo");
        let after_clean = DemoCatalog::verify(&pool).await.expect("verify after clean");
        assert!(after_clean.checks.iter().all(|(_, present)| !present));
    }
}
