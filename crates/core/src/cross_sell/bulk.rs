//! Bulk execution: applies cross-selling rules to the whole catalog and persists
//! the resulting associations.
//!
//! A run resolves the field catalog and loads the product pool once, then executes
//! rules one after another. Every target is checked against the association store
//! before it is written, so pairs created by an earlier rule in the same run (or by
//! an earlier run) are reported as skips instead of duplicates.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::cross_sell::condition::ConditionEvaluator;
use crate::cross_sell::fields::FieldCatalog;
use crate::cross_sell::matcher::{Criterion, MatchError, TargetMatcher};
use crate::cross_sell::ports::{AssociationStore, CustomFieldSource, ProductCatalog, RuleRepository};
use crate::cross_sell::value::DEFAULT_NUMERIC_SCALE;
use crate::domain::association::{AssociationWrite, CrossSellingAssociation};
use crate::domain::execution::{BulkExecutionResult, ProductExecutionError};
use crate::domain::product::{Product, ProductId};
use crate::domain::rule::{CrossSellingRule, RuleId};
use crate::errors::{ApplicationError, DomainError};
use crate::events::{EngineEvent, EngineEventKind, EventSink, NoopEventSink};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Offer inactive products as targets.
    pub include_inactive_targets: bool,
    pub numeric_scale: u32,
    pub page_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { include_inactive_targets: false, numeric_scale: DEFAULT_NUMERIC_SCALE, page_size: 200 }
    }
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            include_inactive_targets: config.engine.include_inactive_targets,
            numeric_scale: config.engine.numeric_scale,
            page_size: config.catalog.page_size as usize,
        }
    }
}

/// Failures that abort a run before any report is produced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BulkExecutionError {
    #[error("rule id must not be blank")]
    InvalidRuleId,
    #[error("cross-selling rule not found: {0}")]
    RuleNotFound(RuleId),
    #[error("could not load cross-selling rules: {0}")]
    RuleRepository(ApplicationError),
    #[error("could not load custom field definitions: {0}")]
    FieldCatalog(ApplicationError),
    #[error("could not load products: {0}")]
    Catalog(ApplicationError),
}

impl From<BulkExecutionError> for ApplicationError {
    fn from(value: BulkExecutionError) -> Self {
        match value {
            BulkExecutionError::InvalidRuleId => {
                DomainError::InvariantViolation("rule id must not be blank".to_owned()).into()
            }
            BulkExecutionError::RuleNotFound(rule_id) => DomainError::RuleNotFound(rule_id.0).into(),
            BulkExecutionError::RuleRepository(error)
            | BulkExecutionError::FieldCatalog(error)
            | BulkExecutionError::Catalog(error) => error,
        }
    }
}

#[derive(Debug, Error)]
enum SourceFailure {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("association store failure: {0}")]
    Store(#[from] ApplicationError),
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    sources: usize,
    processed: usize,
    created: usize,
    skipped: usize,
    failed: usize,
}

pub struct BulkExecutor {
    rules: Arc<dyn RuleRepository>,
    catalog: Arc<dyn ProductCatalog>,
    custom_fields: Arc<dyn CustomFieldSource>,
    associations: Arc<dyn AssociationStore>,
    events: Arc<dyn EventSink>,
    options: EngineOptions,
    evaluator: ConditionEvaluator,
    matcher: TargetMatcher,
}

impl BulkExecutor {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        catalog: Arc<dyn ProductCatalog>,
        custom_fields: Arc<dyn CustomFieldSource>,
        associations: Arc<dyn AssociationStore>,
        options: EngineOptions,
    ) -> Self {
        Self {
            rules,
            catalog,
            custom_fields,
            associations,
            events: Arc::new(NoopEventSink),
            evaluator: ConditionEvaluator::new(options.numeric_scale),
            matcher: TargetMatcher::new(options.numeric_scale),
            options,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Runs one rule (active or not) when `rule_id` is given, otherwise every active
    /// rule in repository order.
    pub async fn execute_bulk(
        &self,
        rule_id: Option<&RuleId>,
    ) -> Result<BulkExecutionResult, BulkExecutionError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("bulk_execution", run_id = %run_id);
        self.run(run_id, rule_id).instrument(span).await
    }

    async fn run(
        &self,
        run_id: String,
        rule_id: Option<&RuleId>,
    ) -> Result<BulkExecutionResult, BulkExecutionError> {
        let rules = self.load_rules(rule_id).await?;
        let custom_fields = self
            .custom_fields
            .list_custom_fields()
            .await
            .map_err(BulkExecutionError::FieldCatalog)?;
        let catalog = FieldCatalog::resolve(custom_fields);
        let products = self.load_products().await?;

        info!(
            event_name = "bulk.run_started",
            run_id = %run_id,
            rules = rules.len(),
            products = products.len(),
            "starting bulk cross-selling execution"
        );
        self.events.emit(
            EngineEvent::new(&run_id, EngineEventKind::RunStarted)
                .with_metadata("rules", rules.len())
                .with_metadata("products", products.len()),
        );

        let candidates: Vec<&Product> = products
            .iter()
            .filter(|product| self.options.include_inactive_targets || product.active)
            .collect();

        let mut result = BulkExecutionResult::new(run_id.clone());
        for rule in &rules {
            let span = info_span!("rule", rule_id = %rule.id);
            let tally = self
                .execute_rule(&run_id, rule, &catalog, &products, &candidates, &mut result)
                .instrument(span)
                .await;

            result.rules_executed.push(rule.id.clone());
            result.total_products += tally.sources;
            result.products_processed += tally.processed;
            result.cross_sellings_created += tally.created;
            result.products_skipped += tally.skipped;

            info!(
                event_name = "bulk.rule_completed",
                run_id = %run_id,
                rule_id = %rule.id,
                sources = tally.sources,
                created = tally.created,
                skipped = tally.skipped,
                failed = tally.failed,
                "cross-selling rule executed"
            );
            self.events.emit(
                EngineEvent::new(&run_id, EngineEventKind::RuleCompleted)
                    .for_rule(&rule.id)
                    .with_metadata("sources", tally.sources)
                    .with_metadata("created", tally.created)
                    .with_metadata("skipped", tally.skipped)
                    .with_metadata("failed", tally.failed),
            );
        }

        info!(
            event_name = "bulk.run_completed",
            run_id = %run_id,
            total_products = result.total_products,
            created = result.cross_sellings_created,
            skipped = result.products_skipped,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "bulk cross-selling execution finished"
        );
        self.events.emit(
            EngineEvent::new(&run_id, EngineEventKind::RunCompleted)
                .with_metadata("total_products", result.total_products)
                .with_metadata("created", result.cross_sellings_created)
                .with_metadata("skipped", result.products_skipped)
                .with_metadata("errors", result.errors.len()),
        );

        Ok(result)
    }

    async fn load_rules(
        &self,
        rule_id: Option<&RuleId>,
    ) -> Result<Vec<CrossSellingRule>, BulkExecutionError> {
        let Some(rule_id) = rule_id else {
            return self.rules.list_active_rules().await.map_err(BulkExecutionError::RuleRepository);
        };

        let trimmed = rule_id.0.trim();
        if trimmed.is_empty() {
            return Err(BulkExecutionError::InvalidRuleId);
        }
        let rule_id = RuleId(trimmed.to_owned());

        match self.rules.get_rule(&rule_id).await.map_err(BulkExecutionError::RuleRepository)? {
            Some(rule) => Ok(vec![rule]),
            None => Err(BulkExecutionError::RuleNotFound(rule_id)),
        }
    }

    /// Pages through the catalog. A reported total decides when loading is done;
    /// without one a short page ends it. An empty page, or one that only repeats
    /// products already seen, always ends it.
    async fn load_products(&self) -> Result<Vec<Product>, BulkExecutionError> {
        let page_size = self.options.page_size.max(1);
        let mut products = Vec::new();
        let mut seen: HashSet<ProductId> = HashSet::new();
        let mut offset = 0;

        loop {
            let page = self
                .catalog
                .list_page(offset, page_size)
                .await
                .map_err(BulkExecutionError::Catalog)?;
            let fetched = page.products.len();
            if fetched == 0 {
                break;
            }

            let before = products.len();
            for product in page.products {
                if seen.insert(product.id.clone()) {
                    products.push(product);
                }
            }
            if products.len() == before {
                warn!(
                    event_name = "bulk.catalog_repeating_page",
                    offset,
                    fetched,
                    "catalog page added no new products, stopping pagination"
                );
                break;
            }

            match page.total {
                Some(total) if products.len() >= total => break,
                None if fetched < page_size => break,
                _ => {}
            }
            offset += fetched;
        }

        Ok(products)
    }

    async fn execute_rule(
        &self,
        run_id: &str,
        rule: &CrossSellingRule,
        catalog: &FieldCatalog,
        products: &[Product],
        candidates: &[&Product],
        result: &mut BulkExecutionResult,
    ) -> Tally {
        let conditions = self.evaluator.compile(rule, catalog);
        let criteria = self.matcher.compile(rule, catalog);
        for warning in conditions.warnings.iter().chain(&criteria.warnings) {
            warn!(
                event_name = "bulk.rule_misconfigured",
                rule_id = %warning.rule_id,
                field = %warning.field,
                message = %warning.message,
                "rule references a field it cannot use"
            );
        }
        result.warnings.extend(conditions.warnings);
        result.warnings.extend(criteria.warnings);

        let mut tally = Tally::default();
        let sources = products
            .iter()
            .filter(|product| self.evaluator.matches_all(product, &conditions.predicates));

        for source in sources {
            tally.sources += 1;
            match self.process_source(rule, source, &criteria.criteria, candidates, &mut tally).await
            {
                Ok(()) => tally.processed += 1,
                Err(failure) => {
                    tally.failed += 1;
                    warn!(
                        event_name = "bulk.source_failed",
                        run_id = %run_id,
                        rule_id = %rule.id,
                        product_id = %source.id,
                        error = %failure,
                        "source product could not be processed"
                    );
                    self.events.emit(
                        EngineEvent::new(run_id, EngineEventKind::SourceFailed)
                            .for_rule(&rule.id)
                            .with_metadata("product_id", &source.id)
                            .with_metadata("error", &failure),
                    );
                    result.errors.push(ProductExecutionError {
                        product_id: source.id.clone(),
                        product_name: source.display_name().to_owned(),
                        error: failure.to_string(),
                    });
                }
            }
        }

        tally
    }

    /// Writes the associations for one source. Counts in `tally` are updated as
    /// writes happen, so a failure part way through still reports earlier writes.
    async fn process_source(
        &self,
        rule: &CrossSellingRule,
        source: &Product,
        criteria: &[Criterion],
        candidates: &[&Product],
        tally: &mut Tally,
    ) -> Result<(), SourceFailure> {
        let targets =
            self.matcher.find_targets(source, criteria, candidates.iter().copied(), &source.id)?;

        for target in targets {
            if self.associations.exists(&source.id, &target.id).await? {
                tally.skipped += 1;
                continue;
            }

            let association =
                CrossSellingAssociation::new(source.id.clone(), target.id.clone(), rule.id.clone());
            match self.associations.create(association).await? {
                AssociationWrite::Created => tally.created += 1,
                AssociationWrite::AlreadyExists => tally.skipped += 1,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::{BulkExecutionError, BulkExecutor, EngineOptions};
    use crate::cross_sell::fields::CustomFieldDefinition;
    use crate::cross_sell::ports::{
        AssociationStore, CustomFieldSource, ProductCatalog, ProductPage, RuleRepository,
    };
    use crate::domain::association::{AssociationWrite, CrossSellingAssociation};
    use crate::domain::product::{Product, ProductId};
    use crate::domain::rule::{
        ConditionOperator, CrossSellingRule, MatchType, RuleCondition, RuleId, RuleTargetCriteria,
    };
    use crate::errors::ApplicationError;
    use crate::events::{EngineEventKind, InMemoryEventSink};

    struct FakeRules(Vec<CrossSellingRule>);

    #[async_trait]
    impl RuleRepository for FakeRules {
        async fn list_active_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError> {
            Ok(self.0.iter().filter(|rule| rule.active).cloned().collect())
        }

        async fn get_rule(&self, id: &RuleId) -> Result<Option<CrossSellingRule>, ApplicationError> {
            Ok(self.0.iter().find(|rule| &rule.id == id).cloned())
        }

        async fn list_rules(&self) -> Result<Vec<CrossSellingRule>, ApplicationError> {
            Ok(self.0.clone())
        }

        async fn save_rule(&self, _rule: CrossSellingRule) -> Result<(), ApplicationError> {
            Ok(())
        }
    }

    struct FakeCatalog {
        products: Vec<Product>,
        offline: bool,
        /// Most products any page returns, whatever limit was asked for.
        page_cap: usize,
        report_total: bool,
        ignore_offset: bool,
        requests: Mutex<Vec<(usize, usize)>>,
    }

    impl FakeCatalog {
        fn new(products: Vec<Product>) -> Self {
            Self {
                products,
                offline: false,
                page_cap: usize::MAX,
                report_total: false,
                ignore_offset: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(usize, usize)> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn list_page(&self, offset: usize, limit: usize) -> Result<ProductPage, ApplicationError> {
            if self.offline {
                return Err(ApplicationError::Integration("catalog unreachable".to_owned()));
            }
            self.requests.lock().expect("requests lock").push((offset, limit));
            let skip = if self.ignore_offset { 0 } else { offset };
            let products =
                self.products.iter().skip(skip).take(limit.min(self.page_cap)).cloned().collect();
            let total = self.report_total.then_some(self.products.len());
            Ok(ProductPage { products, total })
        }
    }

    struct FakeFields(Vec<CustomFieldDefinition>);

    #[async_trait]
    impl CustomFieldSource for FakeFields {
        async fn list_custom_fields(&self) -> Result<Vec<CustomFieldDefinition>, ApplicationError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<Vec<CrossSellingAssociation>>,
        reject_source: Option<ProductId>,
    }

    impl FakeStore {
        fn pairs(&self) -> HashSet<(String, String)> {
            self.rows
                .lock()
                .expect("rows lock")
                .iter()
                .map(|row| (row.source_product_id.0.clone(), row.target_product_id.0.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl AssociationStore for FakeStore {
        async fn exists(&self, source: &ProductId, target: &ProductId) -> Result<bool, ApplicationError> {
            Ok(self
                .rows
                .lock()
                .expect("rows lock")
                .iter()
                .any(|row| &row.source_product_id == source && &row.target_product_id == target))
        }

        async fn create(
            &self,
            association: CrossSellingAssociation,
        ) -> Result<AssociationWrite, ApplicationError> {
            if self.reject_source.as_ref() == Some(&association.source_product_id) {
                return Err(ApplicationError::Persistence("disk full".to_owned()));
            }
            self.rows.lock().expect("rows lock").push(association);
            Ok(AssociationWrite::Created)
        }

        async fn list_for_source(
            &self,
            source: &ProductId,
        ) -> Result<Vec<CrossSellingAssociation>, ApplicationError> {
            Ok(self
                .rows
                .lock()
                .expect("rows lock")
                .iter()
                .filter(|row| &row.source_product_id == source)
                .cloned()
                .collect())
        }
    }

    fn lamps_and_bulbs() -> Vec<Product> {
        vec![
            Product::new("lamp-1", "Desk Lamp").with_attribute("category", "Lamps"),
            Product::new("lamp-2", "Floor Lamp").with_attribute("category", "Lamps"),
            Product::new("bulb-1", "LED Bulb").with_attribute("category", "LightBulbs"),
            Product::new("bulb-2", "Halogen Bulb").with_attribute("category", "LightBulbs"),
            Product::new("bulb-3", "Retired Bulb").with_attribute("category", "LightBulbs").inactive(),
        ]
    }

    fn lamps_rule() -> CrossSellingRule {
        CrossSellingRule::new("lamps-to-bulbs", "Lamps need bulbs")
            .with_condition(RuleCondition::new("category", ConditionOperator::Equals, json!("Lamps")))
            .with_criteria(RuleTargetCriteria::literal("category", MatchType::Exact, "LightBulbs"))
    }

    fn executor(
        rules: Vec<CrossSellingRule>,
        catalog: Arc<FakeCatalog>,
        store: Arc<FakeStore>,
        options: EngineOptions,
    ) -> BulkExecutor {
        BulkExecutor::new(
            Arc::new(FakeRules(rules)),
            catalog,
            Arc::new(FakeFields(Vec::new())),
            store,
            options,
        )
    }

    #[tokio::test]
    async fn creates_associations_and_skips_them_on_rerun() {
        let store = Arc::new(FakeStore::default());
        let executor = executor(
            vec![lamps_rule()],
            Arc::new(FakeCatalog::new(lamps_and_bulbs())),
            store.clone(),
            EngineOptions::default(),
        );

        let first = executor.execute_bulk(None).await.expect("first run");
        assert_eq!(first.total_products, 2);
        assert_eq!(first.products_processed, 2);
        assert_eq!(first.cross_sellings_created, 4);
        assert_eq!(first.products_skipped, 0);
        assert!(first.errors.is_empty());
        assert_eq!(first.rules_executed, vec![RuleId("lamps-to-bulbs".to_owned())]);
        assert!(!store.pairs().contains(&("lamp-1".to_owned(), "bulb-3".to_owned())));

        let second = executor.execute_bulk(None).await.expect("second run");
        assert_eq!(second.cross_sellings_created, 0);
        assert_eq!(second.products_skipped, first.cross_sellings_created);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(store.pairs().len(), 4);
    }

    #[tokio::test]
    async fn inactive_targets_are_offered_when_enabled() {
        let store = Arc::new(FakeStore::default());
        let executor = executor(
            vec![lamps_rule()],
            Arc::new(FakeCatalog::new(lamps_and_bulbs())),
            store.clone(),
            EngineOptions { include_inactive_targets: true, ..EngineOptions::default() },
        );

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(result.cross_sellings_created, 6);
        assert!(store.pairs().contains(&("lamp-1".to_owned(), "bulb-3".to_owned())));
    }

    #[tokio::test]
    async fn rule_id_selection_validates_and_runs_inactive_rules() {
        let store = Arc::new(FakeStore::default());
        let executor = executor(
            vec![lamps_rule().deactivated()],
            Arc::new(FakeCatalog::new(lamps_and_bulbs())),
            store,
            EngineOptions::default(),
        );

        let all = executor.execute_bulk(None).await.expect("run without rules");
        assert!(all.rules_executed.is_empty());
        assert_eq!(all.total_products, 0);

        let blank = executor.execute_bulk(Some(&RuleId("   ".to_owned()))).await;
        assert_eq!(blank, Err(BulkExecutionError::InvalidRuleId));

        let unknown = executor.execute_bulk(Some(&RuleId("nope".to_owned()))).await;
        assert_eq!(unknown, Err(BulkExecutionError::RuleNotFound(RuleId("nope".to_owned()))));

        let explicit =
            executor.execute_bulk(Some(&RuleId("lamps-to-bulbs".to_owned()))).await.expect("run");
        assert_eq!(explicit.cross_sellings_created, 4);
    }

    #[tokio::test]
    async fn store_failure_is_reported_per_source_and_run_continues() {
        let store = Arc::new(FakeStore {
            reject_source: Some(ProductId("lamp-1".to_owned())),
            ..FakeStore::default()
        });
        let events = InMemoryEventSink::default();
        let executor = executor(
            vec![lamps_rule()],
            Arc::new(FakeCatalog::new(lamps_and_bulbs())),
            store,
            EngineOptions::default(),
        )
        .with_events(Arc::new(events.clone()));

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].product_id, ProductId("lamp-1".to_owned()));
        assert_eq!(result.errors[0].product_name, "Desk Lamp");
        assert_eq!(result.products_processed + result.errors.len(), result.total_products);
        assert_eq!(result.cross_sellings_created, 2);
        assert_eq!(
            events.kinds(),
            vec![
                EngineEventKind::RunStarted,
                EngineEventKind::SourceFailed,
                EngineEventKind::RuleCompleted,
                EngineEventKind::RunCompleted,
            ]
        );
    }

    #[tokio::test]
    async fn catalog_outage_aborts_the_run() {
        let catalog = Arc::new(FakeCatalog { offline: true, ..FakeCatalog::new(Vec::new()) });
        let executor =
            executor(vec![lamps_rule()], catalog, Arc::new(FakeStore::default()), EngineOptions::default());

        let result = executor.execute_bulk(None).await;

        assert!(matches!(result, Err(BulkExecutionError::Catalog(ApplicationError::Integration(_)))));
    }

    #[tokio::test]
    async fn product_pool_is_loaded_in_pages() {
        let catalog = Arc::new(FakeCatalog::new(lamps_and_bulbs()));
        let executor = executor(
            vec![lamps_rule()],
            catalog.clone(),
            Arc::new(FakeStore::default()),
            EngineOptions { page_size: 2, ..EngineOptions::default() },
        );

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(result.total_products, 2);
        assert_eq!(result.cross_sellings_created, 4);
        assert_eq!(catalog.requests(), vec![(0, 2), (2, 2), (4, 2)]);
    }

    #[tokio::test]
    async fn reported_total_keeps_paging_past_short_pages() {
        let catalog = Arc::new(FakeCatalog {
            page_cap: 2,
            report_total: true,
            ..FakeCatalog::new(lamps_and_bulbs())
        });
        let executor = executor(
            vec![lamps_rule()],
            catalog.clone(),
            Arc::new(FakeStore::default()),
            EngineOptions { page_size: 3, ..EngineOptions::default() },
        );

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(result.total_products, 2);
        assert_eq!(result.cross_sellings_created, 4);
        assert_eq!(catalog.requests(), vec![(0, 3), (2, 3), (4, 3)]);
    }

    #[tokio::test]
    async fn catalog_repeating_the_same_page_stops_loading() {
        let products = vec![
            Product::new("lamp-1", "Desk Lamp").with_attribute("category", "Lamps"),
            Product::new("bulb-1", "LED Bulb").with_attribute("category", "LightBulbs"),
            Product::new("bulb-2", "Halogen Bulb").with_attribute("category", "LightBulbs"),
        ];
        let catalog = Arc::new(FakeCatalog {
            ignore_offset: true,
            report_total: true,
            ..FakeCatalog::new(products)
        });
        let executor = executor(
            vec![lamps_rule()],
            catalog.clone(),
            Arc::new(FakeStore::default()),
            EngineOptions { page_size: 2, ..EngineOptions::default() },
        );

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(catalog.requests(), vec![(0, 2), (2, 2)]);
        assert_eq!(result.total_products, 1);
        assert_eq!(result.cross_sellings_created, 1);
    }

    #[tokio::test]
    async fn cross_rule_duplicates_are_skipped() {
        let by_name = CrossSellingRule::new("lamps-by-name", "Lamps by name")
            .with_condition(RuleCondition::new("name", ConditionOperator::Contains, json!("lamp")))
            .with_criteria(RuleTargetCriteria::literal("category", MatchType::Exact, "LightBulbs"));
        let store = Arc::new(FakeStore::default());
        let catalog = Arc::new(FakeCatalog::new(lamps_and_bulbs()));
        let executor = executor(
            vec![lamps_rule(), by_name],
            catalog.clone(),
            store.clone(),
            EngineOptions::default(),
        );

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(catalog.requests(), vec![(0, 200)]);
        assert_eq!(result.total_products, 4);
        assert_eq!(result.cross_sellings_created, 4);
        assert_eq!(result.products_skipped, 4);
        assert_eq!(store.pairs().len(), 4);
    }

    #[tokio::test]
    async fn misconfigured_rules_surface_warnings_without_failing() {
        let rule = CrossSellingRule::new("broken", "Broken rule")
            .with_condition(RuleCondition::new("colour", ConditionOperator::Equals, json!("red")))
            .with_criteria(RuleTargetCriteria::relative("socket", MatchType::SameProperty));
        let executor = BulkExecutor::new(
            Arc::new(FakeRules(vec![rule])),
            Arc::new(FakeCatalog::new(lamps_and_bulbs())),
            Arc::new(FakeFields(vec![CustomFieldDefinition::new(
                "socket",
                "Socket",
                crate::cross_sell::fields::FieldType::Enum,
            )])),
            Arc::new(FakeStore::default()),
            EngineOptions::default(),
        );

        let result = executor.execute_bulk(None).await.expect("run");

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "colour");
        assert_eq!(result.total_products, 0);
    }
}
