//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Monetary columns hold integer minor units (cents); the `core` layer converts
//! them to fixed-point decimals.

pub mod bank_account;
pub mod bank_transfer;
pub mod connection;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use bank_account::{
    Column as BankAccountColumn, Entity as BankAccount, Model as BankAccountModel,
};
pub use bank_transfer::{
    Column as BankTransferColumn, Entity as BankTransfer, Model as BankTransferModel,
};
pub use connection::{Column as ConnectionColumn, Entity as Connection, Model as ConnectionModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
