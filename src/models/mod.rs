pub mod dividend;
pub mod investment;
pub mod order;
pub mod property;
pub mod token;
pub mod transaction;

pub use dividend::{Dividend, DividendPayment, DividendStatus};
pub use investment::{Holding, Investment, InvestmentStatus};
pub use order::{Order, OrderSide, OrderStatus};
pub use property::{Property, PropertyStatus};
pub use token::PropertyToken;
pub use transaction::Transaction;
