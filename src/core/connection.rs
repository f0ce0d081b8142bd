//! Connection graph - the symmetric "can send money to" relation between users.
//!
//! An edge is a single row keyed by the canonically ordered pair of user ids,
//! so adding or removing it always affects both directions at once. Callers only
//! ever receive [`ConnectionView`] snapshots, never the edge rows themselves.

use crate::{
    core::user::load_user,
    entities::{Connection, User, connection, user},
    errors::{Error, Resource, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, warn};

/// Two distinct user ids, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionPair {
    first: i64,
    second: i64,
}

impl ConnectionPair {
    /// Orders the pair canonically.
    ///
    /// # Errors
    /// Returns `InvalidOperation` when both ids are the same user.
    pub fn new(a: i64, b: i64) -> Result<Self> {
        if a == b {
            return Err(Error::invalid_operation(
                "A user can't be connected to themselves",
            ));
        }
        Ok(Self {
            first: a.min(b),
            second: a.max(b),
        })
    }

    /// Lower user id.
    #[must_use]
    pub const fn first(&self) -> i64 {
        self.first
    }

    /// Higher user id.
    #[must_use]
    pub const fn second(&self) -> i64 {
        self.second
    }
}

/// Read-only view of a connected user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionView {
    /// Id of the connected user
    pub user_id: i64,
    /// Given name
    pub firstname: String,
    /// Family name
    pub lastname: String,
    /// Email the connection was made with
    pub email: String,
}

impl From<user::Model> for ConnectionView {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            firstname: user.firstname,
            lastname: user.lastname,
            email: user.email,
        }
    }
}

fn touching(user_id: i64) -> Condition {
    Condition::any()
        .add(connection::Column::FirstUserId.eq(user_id))
        .add(connection::Column::SecondUserId.eq(user_id))
}

async fn find_edge<C>(db: &C, pair: ConnectionPair) -> Result<Option<connection::Model>>
where
    C: ConnectionTrait,
{
    Connection::find_by_id((pair.first, pair.second))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether `a` and `b` are directly connected. A user is never connected to itself.
pub async fn is_connected<C>(db: &C, a: i64, b: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Ok(pair) = ConnectionPair::new(a, b) else {
        return Ok(false);
    };
    Ok(find_edge(db, pair).await?.is_some())
}

async fn list_connections<C>(db: &C, user_id: i64) -> Result<Vec<ConnectionView>>
where
    C: ConnectionTrait,
{
    let counterpart_ids: Vec<i64> = Connection::find()
        .filter(touching(user_id))
        .all(db)
        .await?
        .iter()
        .map(|edge| edge.counterpart_of(user_id))
        .collect();

    if counterpart_ids.is_empty() {
        return Ok(Vec::new());
    }

    let users = User::find()
        .filter(user::Column::Id.is_in(counterpart_ids))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;
    Ok(users.into_iter().map(ConnectionView::from).collect())
}

/// Lists the users directly connected to `user_id`, ordered by id.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user.
pub async fn get_connections(db: &DatabaseConnection, user_id: i64) -> Result<Vec<ConnectionView>> {
    load_user(db, user_id).await?;
    list_connections(db, user_id).await
}

/// Connects `user_id` with the user registered under `counterpart_email`.
///
/// Both directions become visible in the same commit. Returns the updated
/// connection list of `user_id`.
///
/// # Errors
/// - `ResourceNotFound` if either user does not exist
/// - `InvalidOperation` if the email is the user's own
/// - `ResourceAlreadyExists` if the two users are already connected
pub async fn add_connection(
    db: &DatabaseConnection,
    user_id: i64,
    counterpart_email: &str,
) -> Result<Vec<ConnectionView>> {
    let txn = db.begin().await?;
    let user = load_user(&txn, user_id).await?;

    if user.email == counterpart_email {
        warn!(user_id, "Attempt to connect a user to themselves");
        return Err(Error::invalid_operation(
            "A user can't add themselves as a connection",
        ));
    }

    let counterpart = User::find()
        .filter(user::Column::Email.eq(counterpart_email))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(Resource::User, counterpart_email))?;

    let pair = ConnectionPair::new(user.id, counterpart.id)?;
    if find_edge(&txn, pair).await?.is_some() {
        warn!(user_id, counterpart_id = counterpart.id, "Connection already exists");
        return Err(Error::already_exists(Resource::Connection, counterpart_email));
    }

    connection::ActiveModel {
        first_user_id: Set(pair.first),
        second_user_id: Set(pair.second),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::from_unique_violation(e, Resource::Connection, counterpart_email))?;

    let connections = list_connections(&txn, user_id).await?;
    txn.commit().await?;
    info!(user_id, counterpart_id = counterpart.id, "Users connected");
    Ok(connections)
}

/// Removes the connection between `user_id` and `counterpart_id`, both directions.
///
/// Returns the updated connection list of `user_id`.
///
/// # Errors
/// Returns `ResourceNotFound` for an unknown user or when the two are not connected.
pub async fn remove_connection(
    db: &DatabaseConnection,
    user_id: i64,
    counterpart_id: i64,
) -> Result<Vec<ConnectionView>> {
    let txn = db.begin().await?;
    load_user(&txn, user_id).await?;

    let edge = match ConnectionPair::new(user_id, counterpart_id) {
        Ok(pair) => find_edge(&txn, pair).await?,
        Err(_) => None,
    }
    .ok_or_else(|| Error::not_found(Resource::Connection, counterpart_id))?;

    edge.delete(&txn).await?;

    let connections = list_connections(&txn, user_id).await?;
    txn.commit().await?;
    info!(user_id, counterpart_id, "Users disconnected");
    Ok(connections)
}

/// Deletes every edge touching `user_id`. Returns the number of edges removed.
pub(crate) async fn detach_all<C>(db: &C, user_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Connection::delete_many()
        .filter(touching(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_pair_is_canonical() {
        let ab = ConnectionPair::new(3, 7).unwrap();
        let ba = ConnectionPair::new(7, 3).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), 3);
        assert_eq!(ab.second(), 7);
    }

    #[test]
    fn test_pair_rejects_self() {
        assert!(matches!(
            ConnectionPair::new(5, 5),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_connection_is_symmetric() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let connections = add_connection(&db, alice.id, &bob.email).await?;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].user_id, bob.id);

        assert!(is_connected(&db, alice.id, bob.id).await?);
        assert!(is_connected(&db, bob.id, alice.id).await?);

        let bobs = get_connections(&db, bob.id).await?;
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].user_id, alice.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_connection_duplicate_in_either_direction() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        add_connection(&db, alice.id, &bob.email).await?;

        let again = add_connection(&db, alice.id, &bob.email).await;
        assert!(matches!(
            again,
            Err(Error::ResourceAlreadyExists {
                resource: Resource::Connection,
                ..
            })
        ));

        let reverse = add_connection(&db, bob.id, &alice.email).await;
        assert!(matches!(
            reverse,
            Err(Error::ResourceAlreadyExists { .. })
        ));

        assert_eq!(Connection::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_connection_to_self() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;

        let result = add_connection(&db, alice.id, &alice.email).await;
        assert!(matches!(result, Err(Error::InvalidOperation { .. })));
        assert!(!is_connected(&db, alice.id, alice.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_connection_unknown_email() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;

        let result = add_connection(&db, alice.id, "nobody@example.com").await;
        assert!(matches!(
            result,
            Err(Error::ResourceNotFound {
                resource: Resource::User,
                ..
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_connection_from_either_side() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let carol = create_test_user(&db, "carol").await?;
        add_connection(&db, alice.id, &bob.email).await?;
        add_connection(&db, alice.id, &carol.email).await?;

        // Bob removes the edge Alice created
        let remaining = remove_connection(&db, bob.id, alice.id).await?;
        assert!(remaining.is_empty());

        assert!(!is_connected(&db, alice.id, bob.id).await?);
        assert!(!is_connected(&db, bob.id, alice.id).await?);

        let alices = get_connections(&db, alice.id).await?;
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].user_id, carol.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_missing_connection() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let result = remove_connection(&db, alice.id, bob.id).await;
        assert!(matches!(
            result,
            Err(Error::ResourceNotFound {
                resource: Resource::Connection,
                ..
            })
        ));

        let to_self = remove_connection(&db, alice.id, alice.id).await;
        assert!(matches!(to_self, Err(Error::ResourceNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_connections_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = get_connections(&db, 77).await;
        assert!(matches!(result, Err(Error::ResourceNotFound { .. })));
        Ok(())
    }
}
