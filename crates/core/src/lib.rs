pub mod category;
pub mod currency;
pub mod money;
pub mod period;
pub mod transaction;

pub use category::{CategoryHierarchy, CategoryKind, CategoryNode, HierarchyError, Side};
pub use currency::{Conversion, ConversionOutcome, CurrencyCode, ExchangeRateTable, RateError};
pub use money::Money;
pub use period::{DateRange, Month, PeriodError};
pub use transaction::{BudgetAllocation, Transaction, TransactionType};
