// ==============================
// tests/unit/resolver_tests.rs
// ==============================
//! Profile resolution: lazy creation, the first-admin rule, conflict
//! retry-reads, and degradation on schema mismatch.
use crate::test_utils::{Fault, FaultyStore, MockIdentityProvider, MockUser};
use backend_lib::auth::{IdentityProvider, ProfileResolver, ResolvedProfile};
use backend_lib::error::AppError;
use backend_lib::store::{FlatFileStore, RowStore};
use chrono::{Duration, Utc};
use rehabdesk_common::Role;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    resolver: ProfileResolver,
    provider: Arc<MockIdentityProvider>,
    store: Arc<FlatFileStore>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FlatFileStore::new(dir.path()).unwrap());
    let provider = Arc::new(MockIdentityProvider::new());
    let resolver = ProfileResolver::new(
        store.clone() as Arc<dyn RowStore>,
        provider.clone() as Arc<dyn IdentityProvider>,
    );
    Fixture {
        resolver,
        provider,
        store,
        _dir: dir,
    }
}

#[tokio::test]
async fn first_resolution_creates_a_staff_profile() {
    let f = fixture();
    f.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let session = f.provider.issue_session("u1", Utc::now() + Duration::hours(1));

    let resolved = f.resolver.resolve(&session).await.unwrap();
    let profile = match resolved {
        ResolvedProfile::Created(profile) => profile,
        other => panic!("expected the created path, got {other:?}"),
    };
    assert_eq!(profile.id, "u1");
    assert_eq!(profile.role, Role::Staff);
    assert_eq!(profile.email, "staff@clinic.example");

    // and the row is actually in the store
    let row = f.store.profile_by_id("u1").await.unwrap().unwrap();
    assert_eq!(row.role, Role::Staff);
}

#[tokio::test]
async fn second_resolution_fetches_the_existing_row() {
    let f = fixture();
    f.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let session = f.provider.issue_session("u1", Utc::now() + Duration::hours(1));

    let first = f.resolver.resolve(&session).await.unwrap();
    assert!(matches!(first, ResolvedProfile::Created(_)));

    let second = f.resolver.resolve(&session).await.unwrap();
    assert!(matches!(second, ResolvedProfile::Fetched(_)));
}

#[tokio::test]
async fn first_oauth_identity_becomes_admin_then_staff() {
    let f = fixture();
    f.provider
        .add_user(MockUser::oauth_user("g1", "first@clinic.example", "google"));
    f.provider
        .add_user(MockUser::oauth_user("g2", "second@clinic.example", "google"));

    let session = f.provider.issue_session("g1", Utc::now() + Duration::hours(1));
    let first = f.resolver.resolve(&session).await.unwrap().into_profile();
    assert_eq!(first.role, Role::Admin);
    assert_eq!(first.oauth_provider.as_deref(), Some("google"));

    let session = f.provider.issue_session("g2", Utc::now() + Duration::hours(1));
    let second = f.resolver.resolve(&session).await.unwrap().into_profile();
    assert_eq!(second.role, Role::Staff);
}

#[tokio::test]
async fn password_identity_never_becomes_admin() {
    // zero admins exist, but the identity came through the password path
    let f = fixture();
    f.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let session = f.provider.issue_session("u1", Utc::now() + Duration::hours(1));

    let profile = f.resolver.resolve(&session).await.unwrap().into_profile();
    assert_eq!(profile.role, Role::Staff);
}

#[tokio::test]
async fn concurrent_resolution_creates_exactly_one_row() {
    let f = fixture();
    f.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let session = f.provider.issue_session("u1", Utc::now() + Duration::hours(1));

    let (a, b) = tokio::join!(f.resolver.resolve(&session), f.resolver.resolve(&session));
    let a = a.unwrap();
    let b = b.unwrap();

    // Both callers end up with the same profile...
    assert_eq!(a.profile().id, "u1");
    assert_eq!(b.profile().id, "u1");
    // ...at most one of them took the created path...
    let created = usize::from(matches!(&a, ResolvedProfile::Created(_)))
        + usize::from(matches!(&b, ResolvedProfile::Created(_)));
    assert!(created <= 1);
    // ...and exactly one row exists.
    assert!(f.store.profile_by_id("u1").await.unwrap().is_some());
    assert_eq!(f.store.count_admins().await.unwrap(), 0);
}

#[tokio::test]
async fn schema_error_degrades_to_a_synthesized_profile() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new(FlatFileStore::new(dir.path()).unwrap()));
    *store.fail_profile_by_id.lock().unwrap() = Some(Fault::Schema);

    let provider = Arc::new(MockIdentityProvider::new());
    provider.add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let session = provider.issue_session("u1", Utc::now() + Duration::hours(1));

    let resolver = ProfileResolver::new(
        store.clone() as Arc<dyn RowStore>,
        provider.clone() as Arc<dyn IdentityProvider>,
    );

    let resolved = resolver.resolve(&session).await.unwrap();
    assert!(resolved.is_synthesized());
    assert_eq!(resolved.profile().email, "staff@clinic.example");
    assert_eq!(resolved.profile().role, Role::Staff);
}

#[tokio::test]
async fn revoked_token_surfaces_an_authorization_error() {
    let f = fixture();
    f.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let mut session = f.provider.issue_session("u1", Utc::now() + Duration::hours(1));
    session.access_token = "revoked".to_string();

    let err = f.resolver.resolve(&session).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[tokio::test]
async fn non_conflict_insert_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new(FlatFileStore::new(dir.path()).unwrap()));
    *store.fail_insert_profile.lock().unwrap() = Some(Fault::Internal);

    let provider = Arc::new(MockIdentityProvider::new());
    provider.add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    let session = provider.issue_session("u1", Utc::now() + Duration::hours(1));

    let resolver = ProfileResolver::new(
        store.clone() as Arc<dyn RowStore>,
        provider.clone() as Arc<dyn IdentityProvider>,
    );

    let err = resolver.resolve(&session).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}
