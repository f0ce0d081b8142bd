//! Transfer engine - moves money between wallets and between a wallet and a bank account.
//!
//! Each request is one database transaction: both balance changes and the history
//! record commit together or not at all. Balances are written with a compare-and-save
//! against the value that was loaded, so two requests racing on the same account can
//! never lose an update; the loser fails with `ConcurrentModification` and nothing it
//! did is kept.
//!
//! A transaction requires the two users to be directly connected. The fee is paid by
//! the emitter on top of the amount and is not credited to anyone.

use crate::{
    config::LedgerConfig,
    core::{
        balance::{self, BalanceAccount},
        bank_account::load_owned_account,
        connection,
        page::{self, Page, PageRequest},
        user::load_user,
    },
    entities::{BankTransfer, Transaction, bank_transfer, transaction, user},
    errors::{Error, Result},
};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// A user-to-user payment request
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    /// User paying amount and fee
    pub emitter_id: i64,
    /// User receiving the amount
    pub receiver_id: i64,
    /// Free text kept on the record
    pub description: String,
    /// Amount the receiver gets; the fee comes on top
    pub amount: Decimal,
}

/// A wallet <-> bank account movement request
#[derive(Debug, Clone)]
pub struct BankTransferRequest {
    /// Wallet owner
    pub user_id: i64,
    /// Account of that owner
    pub bank_account_id: i64,
    /// Amount moved, in either direction
    pub amount: Decimal,
    /// `true` moves money from the bank account into the wallet
    pub is_income: bool,
}

fn display_name(user: &user::Model) -> String {
    format!("{} {}", user.firstname, user.lastname)
}

/// Computes the fee charged on `amount`, rounded once to cents, half-up.
///
/// # Errors
/// Returns `InvalidAmount` for a negative amount or on overflow.
pub fn calculate_fee(amount: Decimal, config: &LedgerConfig) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    amount
        .checked_mul(config.fee_percentage)
        .and_then(|raw| raw.checked_div(Decimal::ONE_HUNDRED))
        .map(|raw| raw.round_dp_with_strategy(balance::SCALE, RoundingStrategy::MidpointAwayFromZero))
        .ok_or(Error::InvalidAmount { amount })
}

/// Sends `amount` from the emitter's wallet to the receiver's wallet.
///
/// The emitter is debited `amount + fee`, the receiver credited `amount`.
///
/// # Errors
/// - `ResourceNotFound` if either user does not exist
/// - `InvalidAmount` if the amount is not strictly positive with at most two decimals
/// - `InvalidOperation` if emitter and receiver are the same user or are not connected
/// - `InsufficientProvision` if the emitter cannot cover amount and fee
/// - `ExceedingBalanceCeiling` if the receiver's wallet would pass the configured ceiling
/// - `ConcurrentModification` if a wallet changed while the request ran
pub async fn request_transaction(
    db: &DatabaseConnection,
    config: &LedgerConfig,
    request: TransactionRequest,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;
    let mut emitter = load_user(&txn, request.emitter_id).await?;
    let mut receiver = load_user(&txn, request.receiver_id).await?;

    let amount_cents = balance::validate_amount(request.amount)?;
    if emitter.id == receiver.id {
        return Err(Error::invalid_operation(
            "A user can't send money to themselves",
        ));
    }
    if !connection::is_connected(&txn, emitter.id, receiver.id).await? {
        warn!(
            emitter_id = emitter.id,
            receiver_id = receiver.id,
            "Transaction refused between unconnected users"
        );
        return Err(Error::invalid_operation(
            "The receiver is not one of the emitter's connections",
        ));
    }

    let fee = calculate_fee(request.amount, config)?;
    let fee_cents = balance::to_cents(fee)?;
    let total = request
        .amount
        .checked_add(fee)
        .ok_or(Error::InvalidAmount {
            amount: request.amount,
        })?;

    let emitter_loaded = emitter.wallet_cents;
    let receiver_loaded = receiver.wallet_cents;

    emitter.debit(total)?;
    balance::ensure_within_ceiling(&receiver, request.amount, config.wallet_ceiling)?;
    receiver.credit(request.amount)?;

    balance::save_wallet(&txn, &emitter, emitter_loaded).await?;
    balance::save_wallet(&txn, &receiver, receiver_loaded).await?;

    let record = transaction::ActiveModel {
        emitter_id: Set(Some(emitter.id)),
        receiver_id: Set(Some(receiver.id)),
        emitter_name: Set(display_name(&emitter)),
        receiver_name: Set(display_name(&receiver)),
        description: Set(request.description),
        amount_cents: Set(amount_cents),
        fee_cents: Set(fee_cents),
        date: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        transaction_id = record.id,
        emitter_id = emitter.id,
        receiver_id = receiver.id,
        amount = %request.amount,
        %fee,
        "Transaction committed"
    );
    Ok(record)
}

/// Moves `amount` between a user's wallet and one of their bank accounts.
///
/// # Errors
/// - `ResourceNotFound` if the user does not exist or does not own the account
/// - `InvalidAmount` if the amount is not strictly positive with at most two decimals
/// - `InsufficientProvision` if the debited side cannot cover the amount
/// - `ExceedingBalanceCeiling` if the credited side would pass its configured ceiling
/// - `ConcurrentModification` if either balance changed while the request ran
pub async fn request_bank_transfer(
    db: &DatabaseConnection,
    config: &LedgerConfig,
    request: BankTransferRequest,
) -> Result<bank_transfer::Model> {
    let txn = db.begin().await?;
    let mut user = load_user(&txn, request.user_id).await?;
    let mut account = load_owned_account(&txn, user.id, request.bank_account_id).await?;

    let amount_cents = balance::validate_amount(request.amount)?;

    let wallet_loaded = user.wallet_cents;
    let account_loaded = account.balance_cents;

    if request.is_income {
        account.debit(request.amount)?;
        balance::ensure_within_ceiling(&user, request.amount, config.wallet_ceiling)?;
        user.credit(request.amount)?;
    } else {
        user.debit(request.amount)?;
        balance::ensure_within_ceiling(&account, request.amount, config.bank_account_ceiling)?;
        account.credit(request.amount)?;
    }

    balance::save_wallet(&txn, &user, wallet_loaded).await?;
    balance::save_bank_balance(&txn, &account, account_loaded).await?;

    let record = bank_transfer::ActiveModel {
        bank_account_id: Set(Some(account.id)),
        user_id: Set(Some(user.id)),
        account_title: Set(account.title.clone()),
        amount_cents: Set(amount_cents),
        is_income: Set(request.is_income),
        date: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        bank_transfer_id = record.id,
        user_id = user.id,
        bank_account_id = account.id,
        amount = %request.amount,
        is_income = request.is_income,
        "Bank transfer committed"
    );
    Ok(record)
}

/// Transactions where the user is emitter or receiver, newest first.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user.
pub async fn get_transactions_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    request: PageRequest,
) -> Result<Page<transaction::Model>> {
    load_user(db, user_id).await?;
    let select = Transaction::find()
        .filter(
            Condition::any()
                .add(transaction::Column::EmitterId.eq(user_id))
                .add(transaction::Column::ReceiverId.eq(user_id)),
        )
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id);
    page::fetch_page(db, select, request).await
}

/// Every transaction in the ledger, newest first.
pub async fn get_all_transactions(
    db: &DatabaseConnection,
    request: PageRequest,
) -> Result<Page<transaction::Model>> {
    let select = Transaction::find()
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id);
    page::fetch_page(db, select, request).await
}

/// Bank transfers of a user, newest first. Includes transfers of deleted accounts.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user.
pub async fn get_bank_transfers_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    request: PageRequest,
) -> Result<Page<bank_transfer::Model>> {
    load_user(db, user_id).await?;
    let select = BankTransfer::find()
        .filter(bank_transfer::Column::UserId.eq(user_id))
        .order_by_desc(bank_transfer::Column::Date)
        .order_by_desc(bank_transfer::Column::Id);
    page::fetch_page(db, select, request).await
}

/// Every bank transfer in the ledger, newest first.
pub async fn get_all_bank_transfers(
    db: &DatabaseConnection,
    request: PageRequest,
) -> Result<Page<bank_transfer::Model>> {
    let select = BankTransfer::find()
        .order_by_desc(bank_transfer::Column::Date)
        .order_by_desc(bank_transfer::Column::Id);
    page::fetch_page(db, select, request).await
}
