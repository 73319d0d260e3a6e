pub mod bulk;
pub mod condition;
pub mod fields;
pub mod matcher;
pub mod ports;
pub mod value;

pub use bulk::{BulkExecutionError, BulkExecutor, EngineOptions};
pub use condition::{ConditionEvaluator, Predicate};
pub use fields::{CustomFieldDefinition, FieldCatalog, FieldDescriptor, FieldListing, FieldType};
pub use matcher::{Criterion, MatchError, TargetMatcher};
pub use ports::{AssociationStore, CustomFieldSource, ProductCatalog, ProductPage, RuleRepository};
