pub mod config;
pub mod cross_sell;
pub mod domain;
pub mod errors;
pub mod events;

pub use cross_sell::{
    AssociationStore, BulkExecutionError, BulkExecutor, CustomFieldDefinition, CustomFieldSource,
    EngineOptions, FieldCatalog, FieldDescriptor, FieldListing, FieldType, ProductCatalog,
    ProductPage, RuleRepository,
};
pub use domain::association::{AssociationId, AssociationWrite, CrossSellingAssociation};
pub use domain::execution::{BulkExecutionResult, ProductExecutionError, RuleWarning};
pub use domain::product::{Dimensions, FieldValue, Product, ProductId};
pub use domain::rule::{
    ConditionOperator, CrossSellingRule, MatchType, RuleCondition, RuleId, RuleTargetCriteria,
};
pub use errors::{ApplicationError, DomainError, InterfaceError, InterfaceErrorKind};
pub use events::{EngineEvent, EngineEventKind, EventSink, InMemoryEventSink, NoopEventSink};
