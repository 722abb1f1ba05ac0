mod common;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use common::{seed_staff, seed_user, state_with, test_state};
use postboard::{
    ApiError, ProfileAccess,
    error::INVALID_TOKEN,
    handlers::{Payload, ResourceId, posts, profiles, token, users},
    models::{PostPayload, ProfilePayload, TokenRequest, UserPayload},
    repository::{PostRepository, ProfileRepository, UserRepository},
};

fn post_body(title: &str, description: &str) -> PostPayload {
    PostPayload {
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        image: None,
    }
}

fn about(text: &str) -> ProfilePayload {
    ProfilePayload {
        aboutme: Some(text.to_string()),
        ..Default::default()
    }
}

fn credentials(username: &str, password: &str) -> TokenRequest {
    TokenRequest {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
    }
}

// --- Users ---

#[tokio::test]
async fn signup_rejects_short_password_and_accepts_five_chars() {
    let state = test_state();

    let err = users::create_user(
        State(state.clone()),
        Payload(UserPayload {
            username: Some("u".into()),
            password: Some("1234".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let (status, Json(body)) = users::create_user(
        State(state.clone()),
        Payload(UserPayload {
            username: Some("u".into()),
            password: Some("12345".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.username, "u");

    let stored = state.repo.find_user(body.id).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "12345");
}

#[tokio::test]
async fn signup_with_taken_username_is_a_field_error() {
    let state = test_state();
    seed_user(&state, "alice").await;

    let err = users::create_user(
        State(state),
        Payload(UserPayload {
            username: Some("alice".into()),
            password: Some("another".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();

    match err {
        ApiError::Validation(errors) => assert_eq!(
            errors.messages("username"),
            ["A user with that username already exists.".to_string()]
        ),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn any_user_may_retrieve_any_user() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;

    let Json(body) = users::retrieve_user(bob.auth(), State(state), ResourceId(alice.user.id))
        .await
        .unwrap();
    assert_eq!(body.username, "alice");
    assert_eq!(body.email, "alice@example.com");
}

#[tokio::test]
async fn user_cannot_modify_someone_else() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;

    let err = users::partial_update_user(
        bob.auth(),
        State(state.clone()),
        ResourceId(alice.user.id),
        Payload(UserPayload {
            username: Some("hijacked".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    let err = users::delete_user(bob.auth(), State(state.clone()), ResourceId(alice.user.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    let unchanged = state.repo.find_user(alice.user.id).await.unwrap().unwrap();
    assert_eq!(unchanged.username, "alice");
}

#[tokio::test]
async fn put_on_self_requires_password_and_updates_fields() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;

    let err = users::update_user(
        alice.auth(),
        State(state.clone()),
        ResourceId(alice.user.id),
        Payload(UserPayload {
            username: Some("alice2".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    match err {
        ApiError::Validation(errors) => assert!(errors.contains("password")),
        other => panic!("unexpected {:?}", other),
    }

    let Json(body) = users::update_user(
        alice.auth(),
        State(state.clone()),
        ResourceId(alice.user.id),
        Payload(UserPayload {
            username: Some("alice2".into()),
            password: Some("fresh-secret".into()),
            first_name: Some("Alice".into()),
            last_name: Some("Liddell".into()),
            email: Some("alice2@example.com".into()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(body.username, "alice2");
    assert_eq!(body.first_name, "Alice");
    assert_eq!(body.email, "alice2@example.com");
}

#[tokio::test]
async fn staff_may_modify_and_delete_other_users() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let admin = seed_staff(&state, "admin").await;

    let Json(body) = users::partial_update_user(
        admin.auth(),
        State(state.clone()),
        ResourceId(alice.user.id),
        Payload(UserPayload {
            first_name: Some("Renamed".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(body.first_name, "Renamed");

    let status = users::delete_user(admin.auth(), State(state.clone()), ResourceId(alice.user.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let err = users::retrieve_user(alice.auth(), State(state.clone()), ResourceId(4242))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);

    let err = users::delete_user(alice.auth(), State(state), ResourceId(4242))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

// --- Posts ---

#[tokio::test]
async fn poster_comes_from_the_caller() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;

    let (status, Json(post)) =
        posts::create_post(alice.auth(), State(state.clone()), Payload(post_body("T", "D")))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post.poster, alice.user.id);
    assert_eq!(post.image, None);
}

#[tokio::test]
async fn caller_deleted_mid_request_cannot_create() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let auth = alice.auth();
    assert!(state.repo.delete_user(alice.user.id).await.unwrap());

    let err = posts::create_post(auth, State(state.clone()), Payload(post_body("T", "D")))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Unauthenticated(INVALID_TOKEN));

    let err = profiles::create_profile(auth, State(state), Payload(about("hi")))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_owner_cannot_edit_or_delete_post() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;
    let post = state
        .repo
        .create_post(alice.user.id, post_body("T", "D").into_new_post().unwrap())
        .await
        .unwrap();

    let err = posts::update_post(
        bob.auth(),
        State(state.clone()),
        ResourceId(post.id),
        Payload(post_body("X", "Y")),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    let err = posts::delete_post(bob.auth(), State(state.clone()), ResourceId(post.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    assert_eq!(state.repo.find_post(post.id).await.unwrap(), Some(post));
}

#[tokio::test]
async fn owner_patch_changes_only_submitted_fields() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let post = state
        .repo
        .create_post(alice.user.id, post_body("T", "D").into_new_post().unwrap())
        .await
        .unwrap();

    let Json(updated) = posts::partial_update_post(
        alice.auth(),
        State(state.clone()),
        ResourceId(post.id),
        Payload(PostPayload {
            description: Some("new description".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.title, "T");
    assert_eq!(updated.description, "new description");
    assert_eq!(updated.poster, alice.user.id);
    assert_eq!(updated.created_at, post.created_at);
}

#[tokio::test]
async fn put_post_requires_title_and_description() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let post = state
        .repo
        .create_post(alice.user.id, post_body("T", "D").into_new_post().unwrap())
        .await
        .unwrap();

    let err = posts::update_post(
        alice.auth(),
        State(state),
        ResourceId(post.id),
        Payload(PostPayload {
            title: Some("only title".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    match err {
        ApiError::Validation(errors) => {
            assert!(errors.contains("description"));
            assert!(!errors.contains("title"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn staff_may_delete_any_post() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let admin = seed_staff(&state, "admin").await;
    let post = state
        .repo
        .create_post(alice.user.id, post_body("T", "D").into_new_post().unwrap())
        .await
        .unwrap();

    let status = posts::delete_post(admin.auth(), State(state.clone()), ResourceId(post.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.repo.find_post(post.id).await.unwrap(), None);
}

#[tokio::test]
async fn posts_by_poster_filters_or_falls_back_to_all() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;
    for (owner, title) in [(&alice, "a1"), (&bob, "b1"), (&alice, "a2")] {
        state
            .repo
            .create_post(owner.user.id, post_body(title, "D").into_new_post().unwrap())
            .await
            .unwrap();
    }

    let Json(by_alice) = posts::list_posts_by_poster(
        bob.auth(),
        State(state.clone()),
        Path(alice.user.id.to_string()),
    )
    .await
    .unwrap();
    let titles: Vec<_> = by_alice.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["a1", "a2"]);

    let Json(all) = posts::list_posts(bob.auth(), State(state.clone())).await.unwrap();
    for unknown in ["999999", "not-a-number"] {
        let Json(fallback) =
            posts::list_posts_by_poster(bob.auth(), State(state.clone()), Path(unknown.to_string()))
                .await
                .unwrap();
        assert_eq!(fallback, all);
    }
}

#[tokio::test]
async fn posts_by_poster_with_no_posts_is_empty_not_fallback() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;
    state
        .repo
        .create_post(alice.user.id, post_body("a1", "D").into_new_post().unwrap())
        .await
        .unwrap();

    let Json(by_bob) =
        posts::list_posts_by_poster(alice.auth(), State(state), Path(bob.user.id.to_string()))
            .await
            .unwrap();
    assert!(by_bob.is_empty());
}

// --- Profiles ---

#[tokio::test]
async fn profile_is_created_for_the_caller_with_default_country() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;

    let (status, Json(profile)) =
        profiles::create_profile(alice.auth(), State(state), Payload(about("hi")))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile.user, alice.user.id);
    assert_eq!(profile.country, "India");
    assert_eq!(profile.dob, None);
}

#[tokio::test]
async fn second_profile_is_a_conflict_and_keeps_the_first() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;

    let (_, Json(first)) =
        profiles::create_profile(alice.auth(), State(state.clone()), Payload(about("first")))
            .await
            .unwrap();
    let err = profiles::create_profile(alice.auth(), State(state.clone()), Payload(about("second")))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let stored = state.repo.list_profiles().await.unwrap();
    assert_eq!(stored, vec![first]);
}

#[tokio::test]
async fn open_profile_policy_lets_anyone_edit() {
    let state = state_with(ProfileAccess::Open);
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;
    let (_, Json(profile)) =
        profiles::create_profile(alice.auth(), State(state.clone()), Payload(about("mine")))
            .await
            .unwrap();

    let Json(updated) = profiles::partial_update_profile(
        bob.auth(),
        State(state.clone()),
        ResourceId(profile.id),
        Payload(ProfilePayload {
            country: Some("Ireland".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.country, "Ireland");
    assert_eq!(updated.user, alice.user.id);
}

#[tokio::test]
async fn owner_profile_policy_forbids_strangers() {
    let state = state_with(ProfileAccess::OwnerOrStaff);
    let alice = seed_user(&state, "alice").await;
    let bob = seed_user(&state, "bob").await;
    let (_, Json(profile)) =
        profiles::create_profile(alice.auth(), State(state.clone()), Payload(about("mine")))
            .await
            .unwrap();

    let err = profiles::delete_profile(bob.auth(), State(state.clone()), ResourceId(profile.id))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Forbidden);

    let status = profiles::delete_profile(alice.auth(), State(state), ResourceId(profile.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn profile_put_sets_and_clears_dob() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;
    let (_, Json(profile)) =
        profiles::create_profile(alice.auth(), State(state.clone()), Payload(about("mine")))
            .await
            .unwrap();

    let Json(with_dob) = profiles::update_profile(
        alice.auth(),
        State(state.clone()),
        ResourceId(profile.id),
        Payload(ProfilePayload {
            dob: Some(Some("1990-04-21".into())),
            aboutme: Some("still mine".into()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(with_dob.dob.map(|d| d.to_string()), Some("1990-04-21".to_string()));

    let Json(cleared) = profiles::partial_update_profile(
        alice.auth(),
        State(state),
        ResourceId(profile.id),
        Payload(ProfilePayload {
            dob: Some(None),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(cleared.dob, None);
    assert_eq!(cleared.aboutme, "still mine");
}

// --- Token ---

#[tokio::test]
async fn token_is_reused_across_logins() {
    let state = test_state();
    let alice = seed_user(&state, "alice").await;

    let Json(first) = token::obtain_token(
        State(state.clone()),
        Payload(credentials("alice", &alice.password)),
    )
    .await
    .unwrap();
    let Json(second) = token::obtain_token(
        State(state.clone()),
        Payload(credentials("alice", &alice.password)),
    )
    .await
    .unwrap();

    assert_eq!(first.token, second.token);
    assert_eq!(first.token, alice.token);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let state = test_state();
    seed_user(&state, "alice").await;

    let wrong = token::obtain_token(State(state.clone()), Payload(credentials("alice", "nope!")))
        .await
        .unwrap_err();
    let unknown = token::obtain_token(State(state), Payload(credentials("nobody", "nope!")))
        .await
        .unwrap_err();

    assert_eq!(wrong, ApiError::invalid_credentials());
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn unknown_user_is_refused_even_with_the_placeholder_password() {
    let state = test_state();
    let err = token::obtain_token(
        State(state),
        Payload(credentials("nobody", "postboard-unknown-user")),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::invalid_credentials());
}

#[tokio::test]
async fn unknown_user_login_costs_a_password_check() {
    let state = test_state();
    seed_user(&state, "alice").await;

    async fn timed(state: &postboard::AppState, username: &str) -> std::time::Duration {
        let start = std::time::Instant::now();
        let _ = token::obtain_token(State(state.clone()), Payload(credentials(username, "nope!"))).await;
        start.elapsed()
    }

    // Warm up the lazily built placeholder hash.
    timed(&state, "nobody").await;

    let wrong = timed(&state, "alice").await;
    let unknown = timed(&state, "nobody").await;
    assert!(
        unknown * 4 >= wrong,
        "unknown user answered in {:?}, wrong password in {:?}",
        unknown,
        wrong
    );
}

#[tokio::test]
async fn token_request_requires_both_fields() {
    let state = test_state();
    let err = token::obtain_token(State(state), Payload(TokenRequest::default()))
        .await
        .unwrap_err();
    match err {
        ApiError::Validation(errors) => {
            assert!(errors.contains("username"));
            assert!(errors.contains("password"));
        }
        other => panic!("unexpected {:?}", other),
    }
}
