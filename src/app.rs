use chrono::NaiveDateTime;
use gloo_timers::future::TimeoutFuture;
use leptos::ev::SubmitEvent;
use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use leptos::server_fn::error::NoCustomError;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::use_navigate,
    path, NavigateOptions,
};

use crate::auth::{AuthEvent, AuthState, Role};
use crate::filter::{filter_challenges, filter_leaderboard, filter_logs, CategoryFilter};
use crate::forms::{validate_team_name, AuthForm, ChallengeForm, MAX_TEAM_NAME_LEN};
use crate::model::{Category, ChallengeSummary, LeaderboardEntry, SessionUser, SubmissionLog, UserStats};
use crate::paging::{
    clamp_page, page_numbers, page_slice, total_pages, PageItem, CHALLENGES_PAGE_SIZE,
    LEADERBOARD_PAGE_SIZE, LOGS_PAGE_SIZE,
};
use crate::submission::{FlagDialog, FlagVerdict, SOLVE_DISPLAY_DELAY_MS};

#[cfg(feature = "ssr")]
use crate::{
    auth::{cookie_value, expired_session_cookie, session_cookie, SESSION_COOKIE},
    config::Config,
    create_challenge, delete_challenge,
    error::CtfError,
    get_all_challenges, get_leaderboard, get_submission_logs, get_user_by_token, get_user_stats,
    is_unique_violation, log_submission, sign_in_user, sign_out_token, sign_up_user,
    store::DbStore,
    submission::submit_flag,
    update_team_name, SUBMISSION_LOG_LIMIT,
};
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;

#[cfg(feature = "ssr")]
fn server_error(e: impl std::fmt::Display) -> ServerFnError<NoCustomError> {
    ServerFnError::ServerError(e.to_string())
}

/// Runs blocking store work on a pooled connection.
#[cfg(feature = "ssr")]
async fn with_conn<T, F>(work: F) -> Result<T, ServerFnError<NoCustomError>>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, ServerFnError<NoCustomError>> + Send + 'static,
{
    let store: DbStore = expect_context();
    tokio::task::spawn_blocking(move || {
        let mut conn = store.conn().map_err(server_error)?;
        work(&mut conn)
    })
    .await
    .map_err(server_error)?
}

#[cfg(feature = "ssr")]
async fn session_token() -> Result<Option<String>, ServerFnError<NoCustomError>> {
    use axum::http::{header::COOKIE, HeaderMap};
    use leptos_axum::extract;

    let headers: HeaderMap = extract().await.map_err(server_error)?;
    Ok(headers
        .get(COOKIE)
        .and_then(|header| header.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, SESSION_COOKIE))
        .map(str::to_string))
}

#[cfg(feature = "ssr")]
fn set_cookie(cookie: &str) -> Result<(), ServerFnError<NoCustomError>> {
    use axum::http::{header::SET_COOKIE, HeaderValue};
    use leptos_axum::ResponseOptions;

    let resp: ResponseOptions = expect_context();
    resp.insert_header(
        SET_COOKIE,
        HeaderValue::from_str(cookie).map_err(server_error)?,
    );
    Ok(())
}

// Resolves the session cookie. Unknown, expired, and malformed tokens all mean "nobody".
#[cfg(feature = "ssr")]
async fn current_user() -> Result<Option<SessionUser>, ServerFnError<NoCustomError>> {
    let Some(token) = session_token().await? else {
        return Ok(None);
    };
    with_conn(move |conn| match get_user_by_token(conn, &token) {
        Ok(user) => Ok(Some(SessionUser::from(&user))),
        Err(diesel::result::Error::NotFound) => Ok(None),
        Err(e) => Err(server_error(e)),
    })
    .await
}

#[cfg(feature = "ssr")]
async fn require_user() -> Result<SessionUser, ServerFnError<NoCustomError>> {
    current_user()
        .await?
        .ok_or_else(|| server_error(CtfError::Unauthenticated))
}

// Returns the current user if they are an admin, or an error otherwise.
#[cfg(feature = "ssr")]
async fn check_admin() -> Result<SessionUser, ServerFnError<NoCustomError>> {
    let user = require_user().await?;
    if !user.is_admin {
        warn!("Non-admin {} tried an admin action", user.email);
        return Err(server_error(CtfError::Forbidden));
    }
    Ok(user)
}

#[server(GetCurrentUser)]
pub async fn get_current_user() -> Result<Option<SessionUser>, ServerFnError<NoCustomError>> {
    current_user().await
}

#[server(SignUp)]
pub async fn sign_up(
    team_name: String,
    email: String,
    password: String,
) -> Result<SessionUser, ServerFnError<NoCustomError>> {
    let form = AuthForm::SignUp {
        team_name,
        email,
        password,
    }
    .validate()
    .map_err(server_error)?;
    let AuthForm::SignUp {
        team_name,
        email,
        password,
    } = form
    else {
        return Err(server_error("Invalid sign-up form"));
    };

    let config: Config = expect_context();
    let is_admin = config.is_admin_email(&email);
    let max_age = config.session_max_age_secs;

    let (user, token) = with_conn(move |conn| {
        sign_up_user(conn, &team_name, &email, &password, is_admin, max_age).map_err(|e| {
            if is_unique_violation(&e) {
                server_error("Email already registered")
            } else {
                server_error(e)
            }
        })
    })
    .await?;

    set_cookie(&session_cookie(&token, max_age, config.secure_cookies))?;
    log!("Team {} signed up (admin: {})", user.team_name, user.is_admin);
    Ok(SessionUser::from(&user))
}

#[server(SignIn)]
pub async fn sign_in(
    email: String,
    password: String,
) -> Result<SessionUser, ServerFnError<NoCustomError>> {
    let form = AuthForm::SignIn { email, password }
        .validate()
        .map_err(server_error)?;
    let AuthForm::SignIn { email, password } = form else {
        return Err(server_error("Invalid sign-in form"));
    };

    let config: Config = expect_context();
    let max_age = config.session_max_age_secs;

    let attempted = email.clone();
    let signed_in = with_conn(move |conn| {
        sign_in_user(conn, &email, &password, max_age).map_err(server_error)
    })
    .await?;

    let Some((user, token)) = signed_in else {
        warn!("Failed sign-in for {}", attempted);
        return Err(server_error("Invalid email or password"));
    };

    set_cookie(&session_cookie(&token, max_age, config.secure_cookies))?;
    log!("Team {} signed in", user.team_name);
    Ok(SessionUser::from(&user))
}

#[server(SignOut)]
pub async fn sign_out() -> Result<(), ServerFnError<NoCustomError>> {
    if let Some(token) = session_token().await? {
        with_conn(move |conn| sign_out_token(conn, &token).map_err(server_error)).await?;
    }
    let config: Config = expect_context();
    set_cookie(&expired_session_cookie(config.secure_cookies))
}

#[server(UpdateTeamName)]
pub async fn update_team_name_handler(
    team_name: String,
) -> Result<SessionUser, ServerFnError<NoCustomError>> {
    let user = require_user().await?;
    let team_name = validate_team_name(&team_name).map_err(server_error)?;

    let updated = with_conn(move |conn| {
        update_team_name(conn, &user.id, &team_name).map_err(server_error)
    })
    .await?;
    Ok(SessionUser::from(&updated))
}

#[server(GetChallenges)]
pub async fn get_challenges() -> Result<Vec<ChallengeSummary>, ServerFnError<NoCustomError>> {
    require_user().await?;
    with_conn(|conn| {
        let challenges = get_all_challenges(conn).map_err(server_error)?;
        Ok(challenges.into_iter().map(ChallengeSummary::from).collect())
    })
    .await
}

#[server(GetUserStats)]
pub async fn get_user_stats_handler() -> Result<UserStats, ServerFnError<NoCustomError>> {
    let user = require_user().await?;
    with_conn(move |conn| get_user_stats(conn, &user.id).map_err(server_error)).await
}

#[server(SubmitFlag)]
pub async fn submit_flag_handler(
    challenge_id: String,
    flag: String,
) -> Result<FlagVerdict, ServerFnError<NoCustomError>> {
    let user = current_user().await?;
    let store: DbStore = expect_context();

    let verdict = tokio::task::spawn_blocking(move || {
        let now = chrono::Utc::now().naive_utc();
        let verdict =
            FlagVerdict::from_result(submit_flag(&store, user.as_ref(), &challenge_id, &flag, now));

        // Every attempt by a signed-in user on a real challenge goes in the log.
        if let (Some(user), Ok(verdict)) = (&user, &verdict) {
            let logged = store.conn().map_err(|e| e.to_string()).and_then(|mut conn| {
                log_submission(&mut conn, &user.id, &challenge_id, verdict.is_correct(), now)
                    .map_err(|e| e.to_string())
            });
            if let Err(e) = logged {
                warn!("Failed to log submission for {}: {}", challenge_id, e);
            }
            if let FlagVerdict::Solved { points_awarded } = verdict {
                log!(
                    "{} solved {} for {} points",
                    user.team_name,
                    challenge_id,
                    points_awarded
                );
            }
        }
        verdict
    })
    .await
    .map_err(server_error)?;

    match verdict {
        Ok(verdict) => Ok(verdict),
        // The dialog adds its own "Error submitting flag" prefix.
        Err(CtfError::Submission(message)) => {
            error!("Flag submission failed: {}", message);
            Err(server_error(message))
        }
        Err(e) => Err(server_error(e)),
    }
}

#[server(GetLeaderboard)]
pub async fn get_leaderboard_handler(
) -> Result<Vec<LeaderboardEntry>, ServerFnError<NoCustomError>> {
    with_conn(|conn| get_leaderboard(conn).map_err(server_error)).await
}

#[server(GetSubmissionLogs)]
pub async fn get_submission_logs_handler(
) -> Result<Vec<SubmissionLog>, ServerFnError<NoCustomError>> {
    check_admin().await?;
    with_conn(|conn| get_submission_logs(conn, SUBMISSION_LOG_LIMIT).map_err(server_error)).await
}

#[server(GetAdminChallenges)]
pub async fn get_admin_challenges(
) -> Result<Vec<ChallengeSummary>, ServerFnError<NoCustomError>> {
    check_admin().await?;
    with_conn(|conn| {
        let challenges = get_all_challenges(conn).map_err(server_error)?;
        Ok(challenges.into_iter().map(ChallengeSummary::from).collect())
    })
    .await
}

#[server(CreateChallenge)]
pub async fn create_challenge_handler(
    form: ChallengeForm,
) -> Result<ChallengeSummary, ServerFnError<NoCustomError>> {
    let admin = check_admin().await?;
    let new_challenge = form.validate().map_err(server_error)?;

    let challenge = with_conn(move |conn| {
        create_challenge(conn, &new_challenge).map_err(server_error)
    })
    .await?;
    log!(
        "{} created challenge {} ({})",
        admin.email,
        challenge.title,
        challenge.id
    );
    Ok(ChallengeSummary::from(challenge))
}

#[server(DeleteChallenge)]
pub async fn delete_challenge_handler(
    challenge_id: String,
) -> Result<(), ServerFnError<NoCustomError>> {
    let admin = check_admin().await?;
    let id = challenge_id.clone();
    let deleted =
        with_conn(move |conn| delete_challenge(conn, &id).map_err(server_error)).await?;
    if deleted == 0 {
        return Err(server_error(CtfError::NotFound("Challenge".to_string())));
    }
    log!("{} deleted challenge {}", admin.email, challenge_id);
    Ok(())
}

fn error_message(e: &ServerFnError<NoCustomError>) -> String {
    match e {
        ServerFnError::ServerError(message) => message.clone(),
        other => other.to_string(),
    }
}

fn dispatch(auth: RwSignal<AuthState>, event: AuthEvent) {
    auth.update(|state| *state = std::mem::take(state).apply(event));
}

fn alert(message: &str) {
    leptos::leptos_dom::helpers::window()
        .alert_with_message(message)
        .unwrap_or_default();
}

fn confirm(message: &str) -> bool {
    leptos::leptos_dom::helpers::window()
        .confirm_with_message(message)
        .unwrap_or(false)
}

fn category_label(raw: &str) -> String {
    raw.parse::<Category>()
        .map(|c| c.label().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The card's decorative success rate: fewer points, higher rate.
fn success_rate(points: i32) -> i32 {
    (100 - points / 10).clamp(10, 100)
}

fn rank_class(rank: usize) -> &'static str {
    match rank {
        1 => "rank rank-gold",
        2 => "rank rank-silver",
        3 => "rank rank-bronze",
        _ => "rank",
    }
}

fn is_open(selected: Option<&ChallengeSummary>, challenge_id: &str) -> bool {
    selected.is_some_and(|open| open.id == challenge_id)
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    let auth = RwSignal::new(AuthState::Unknown);
    provide_context(auth);

    let session = Resource::new(|| (), |_| get_current_user());
    Effect::new(move || {
        if let Some(result) = session.get() {
            let event = match result {
                Ok(user) => AuthEvent::SessionResolved(user),
                Err(e) => {
                    error!("Failed to resolve session: {}", e);
                    AuthEvent::ResolveFailed
                }
            };
            dispatch(auth, event);
        }
    });

    view! {
        <Stylesheet id="leptos" href="/pkg/ctf-board.css" />
        <Title text="CTF Board" />

        <Router>
            <Navbar />
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=AuthPage />
                    <Route
                        path=path!("/dashboard")
                        view=|| {
                            view! {
                                <RequireAuth>
                                    <Dashboard />
                                </RequireAuth>
                            }
                        }
                    />
                    <Route path=path!("/leaderboard") view=Leaderboard />
                    <Route
                        path=path!("/logs")
                        view=|| {
                            view! {
                                <RequireAdmin>
                                    <Logs />
                                </RequireAdmin>
                            }
                        }
                    />
                    <Route
                        path=path!("/admin/challenges")
                        view=|| {
                            view! {
                                <RequireAdmin>
                                    <ChallengeManager />
                                </RequireAdmin>
                            }
                        }
                    />
                </Routes>
            </main>
            <Footer />
        </Router>
    }
}

#[component]
fn Navbar() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let navigate = use_navigate();

    let logout = move |_| {
        let navigate = navigate.clone();
        spawn_local(async move {
            if let Err(e) = sign_out().await {
                error!("Sign out failed: {}", e);
            }
            dispatch(auth, AuthEvent::SignedOut);
            navigate("/", NavigateOptions::default());
        });
    };

    view! {
        <nav class="navbar">
            <a class="brand" href="/">
                "CTF BOARD"
            </a>
            <div class="nav-links">
                {move || match auth.get() {
                    AuthState::Authenticated(user, role) => {
                        view! {
                            <a href="/dashboard">"Dashboard"</a>
                            <a href="/leaderboard">"Leaderboard"</a>
                            {(role == Role::Admin)
                                .then(|| {
                                    view! {
                                        <a href="/logs">"Logs"</a>
                                        <a href="/admin/challenges">"Challenge Manager"</a>
                                    }
                                })}
                            <span class="team-badge">{user.team_name}</span>
                            <button class="btn-logout" on:click=logout.clone()>
                                "Logout"
                            </button>
                        }
                            .into_any()
                    }
                    _ => view! { <a href="/">"Home"</a> }.into_any(),
                }}
            </div>
        </nav>
    }
}

#[component]
fn Footer() -> impl IntoView {
    view! {
        <footer class="footer">
            <h2>"CTF BOARD"</h2>
            <p>"CAPTURE THE FLAG CHALLENGE"</p>
        </footer>
    }
}

/// Renders its children for signed-in users and sends everyone else to the landing page.
#[component]
fn RequireAuth(children: ChildrenFn) -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let navigate = use_navigate();
    Effect::new(move || {
        if auth.with(|state| *state == AuthState::Anonymous) {
            navigate("/", NavigateOptions::default());
        }
    });

    move || {
        if auth.with(AuthState::is_authenticated) {
            children().into_any()
        } else {
            view! { <p class="loading">"Loading..."</p> }.into_any()
        }
    }
}

/// Like `RequireAuth`, but participants are sent to their dashboard.
#[component]
fn RequireAdmin(children: ChildrenFn) -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let navigate = use_navigate();
    Effect::new(move || {
        auth.with(|state| match state {
            AuthState::Anonymous => navigate("/", NavigateOptions::default()),
            AuthState::Authenticated(_, Role::Participant) => {
                navigate("/dashboard", NavigateOptions::default())
            }
            _ => {}
        });
    });

    move || {
        if auth.with(AuthState::is_admin) {
            children().into_any()
        } else {
            view! { <p class="loading">"Loading..."</p> }.into_any()
        }
    }
}

#[component]
fn AuthPage() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let navigate = use_navigate();
    Effect::new(move || {
        if auth.with(AuthState::is_authenticated) {
            navigate("/dashboard", NavigateOptions::default());
        }
    });

    let sign_up_mode = RwSignal::new(false);
    let team_name = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let show_password = RwSignal::new(false);
    let error_msg = RwSignal::new(String::new());
    let loading = RwSignal::new(false);

    let switch_mode = move |to_sign_up: bool| {
        sign_up_mode.set(to_sign_up);
        error_msg.set(String::new());
    };

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        if loading.get() {
            return;
        }
        let form = if sign_up_mode.get() {
            AuthForm::SignUp {
                team_name: team_name.get(),
                email: email.get(),
                password: password.get(),
            }
        } else {
            AuthForm::SignIn {
                email: email.get(),
                password: password.get(),
            }
        };
        let form = match form.validate() {
            Ok(form) => form,
            Err(e) => {
                error_msg.set(e.to_string());
                return;
            }
        };

        loading.set(true);
        error_msg.set(String::new());
        spawn_local(async move {
            let result = match form {
                AuthForm::SignIn { email, password } => sign_in(email, password).await,
                AuthForm::SignUp {
                    team_name,
                    email,
                    password,
                } => sign_up(team_name, email, password).await,
            };
            loading.set(false);
            match result {
                Ok(user) => {
                    password.set(String::new());
                    dispatch(auth, AuthEvent::SignedIn(user));
                }
                Err(e) => error_msg.set(error_message(&e)),
            }
        });
    };

    view! {
        <div class="auth-page">
            <section class="hero">
                <h1>"CTF BOARD"</h1>
                <p>"Solve challenges. Capture flags. Climb the board."</p>
            </section>
            <div class="auth-card">
                <div class="auth-tabs">
                    <button
                        type="button"
                        class:active=move || !sign_up_mode.get()
                        on:click=move |_| switch_mode(false)
                    >
                        "Sign In"
                    </button>
                    <button
                        type="button"
                        class:active=move || sign_up_mode.get()
                        on:click=move |_| switch_mode(true)
                    >
                        "Sign Up"
                    </button>
                </div>
                <form on:submit=submit>
                    {move || {
                        sign_up_mode
                            .get()
                            .then(|| {
                                view! {
                                    <label>
                                        "Team Name"
                                        <input
                                            type="text"
                                            maxlength=MAX_TEAM_NAME_LEN.to_string()
                                            prop:value=move || team_name.get()
                                            on:input=move |ev| team_name.set(event_target_value(&ev))
                                        />
                                    </label>
                                }
                            })
                    }}
                    <label>
                        "Email"
                        <input
                            type="email"
                            prop:value=move || email.get()
                            on:input=move |ev| email.set(event_target_value(&ev))
                        />
                    </label>
                    <label>
                        "Password"
                        <div class="password-field">
                            <input
                                type=move || if show_password.get() { "text" } else { "password" }
                                prop:value=move || password.get()
                                on:input=move |ev| password.set(event_target_value(&ev))
                            />
                            <button
                                type="button"
                                class="btn-link"
                                on:click=move |_| show_password.update(|shown| *shown = !*shown)
                            >
                                {move || if show_password.get() { "Hide" } else { "Show" }}
                            </button>
                        </div>
                    </label>
                    {move || {
                        (!error_msg.get().is_empty())
                            .then(|| view! { <p class="message message-error">{error_msg.get()}</p> })
                    }}
                    <button type="submit" class="btn-primary" disabled=move || loading.get()>
                        {move || match (loading.get(), sign_up_mode.get()) {
                            (true, _) => "Please wait...",
                            (false, true) => "Create Team",
                            (false, false) => "Sign In",
                        }}
                    </button>
                </form>
            </div>
        </div>
    }
}

#[component]
fn StatCard(label: &'static str, value: String) -> impl IntoView {
    view! {
        <div class="stat-card">
            <span class="stat-label">{label}</span>
            <span class="stat-value">{value}</span>
        </div>
    }
}

#[component]
fn TeamNameEditor() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthState>>();
    let editing = RwSignal::new(false);
    let draft = RwSignal::new(String::new());
    let error_msg = RwSignal::new(String::new());
    let saving = RwSignal::new(false);

    let team_name = move || {
        auth.with(|state| {
            state
                .user()
                .map(|user| user.team_name.clone())
                .unwrap_or_default()
        })
    };

    let start = move |_| {
        draft.set(team_name());
        error_msg.set(String::new());
        editing.set(true);
    };

    let save = move |ev: SubmitEvent| {
        ev.prevent_default();
        if saving.get() {
            return;
        }
        let new_name = match validate_team_name(&draft.get()) {
            Ok(name) => name,
            Err(e) => {
                error_msg.set(e.to_string());
                return;
            }
        };
        saving.set(true);
        spawn_local(async move {
            match update_team_name_handler(new_name).await {
                Ok(user) => {
                    dispatch(auth, AuthEvent::TeamRenamed(user.team_name));
                    editing.set(false);
                }
                Err(e) => error_msg.set(error_message(&e)),
            }
            saving.set(false);
        });
    };

    view! {
        <div class="team-editor">
            {move || {
                if editing.get() {
                    view! {
                        <form on:submit=save>
                            <input
                                type="text"
                                maxlength=MAX_TEAM_NAME_LEN.to_string()
                                prop:value=move || draft.get()
                                on:input=move |ev| draft.set(event_target_value(&ev))
                            />
                            <button type="submit" disabled=move || saving.get()>
                                "Save"
                            </button>
                            <button type="button" on:click=move |_| editing.set(false)>
                                "Cancel"
                            </button>
                        </form>
                    }
                        .into_any()
                } else {
                    view! {
                        <span class="team-name">{team_name}</span>
                        <button class="btn-link" on:click=start>
                            "Rename team"
                        </button>
                    }
                        .into_any()
                }
            }}
            {move || {
                (!error_msg.get().is_empty())
                    .then(|| view! { <p class="message message-error">{error_msg.get()}</p> })
            }}
        </div>
    }
}

#[component]
fn Dashboard() -> impl IntoView {
    let challenges = Resource::new(|| (), |_| get_challenges());
    let stats = Resource::new(|| (), |_| get_user_stats_handler());
    let selected = RwSignal::new(None::<ChallengeSummary>);

    let close_modal = Callback::new(move |_: ()| selected.set(None));
    // A delayed solve must not close a dialog opened for another challenge in the meantime.
    let finish_solve = Callback::new(move |challenge_id: String| {
        stats.refetch();
        if selected.with_untracked(|open| is_open(open.as_ref(), &challenge_id)) {
            selected.set(None);
        }
    });

    let solved_ids = move || {
        stats
            .get()
            .and_then(Result::ok)
            .map(|stats| stats.solved_ids)
            .unwrap_or_default()
    };

    view! {
        <div class="dashboard">
            <header class="page-header">
                <h1>"Challenges"</h1>
                <TeamNameEditor />
            </header>
            <Suspense fallback=|| view! { <p class="loading">"Loading stats..."</p> }>
                {move || {
                    stats
                        .get()
                        .map(|result| match result {
                            Ok(stats) => {
                                view! {
                                    <div class="stats">
                                        <StatCard label="TOTAL SCORE" value=stats.score.to_string() />
                                        <StatCard
                                            label="CHALLENGES"
                                            value=format!(
                                                "{} / {}",
                                                stats.solved_count,
                                                stats.total_challenges,
                                            )
                                        />
                                    </div>
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! {
                                    <p class="message message-error">
                                        {format!("Error loading stats: {}", error_message(&e))}
                                    </p>
                                }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
            <Suspense fallback=|| view! { <p class="loading">"Loading challenges..."</p> }>
                {move || {
                    challenges
                        .get()
                        .map(|result| match result {
                            Ok(list) if list.is_empty() => {
                                view! {
                                    <p class="empty">"No challenges have been published yet."</p>
                                }
                                    .into_any()
                            }
                            Ok(list) => {
                                let solved = solved_ids();
                                view! {
                                    <div class="challenge-grid">
                                        {list
                                            .into_iter()
                                            .map(|challenge| {
                                                let is_solved = solved.contains(&challenge.id);
                                                view! {
                                                    <ChallengeCard
                                                        challenge=challenge
                                                        solved=is_solved
                                                        on_open=move |c: ChallengeSummary| {
                                                            selected.set(Some(c))
                                                        }
                                                    />
                                                }
                                            })
                                            .collect_view()}
                                    </div>
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! {
                                    <p class="message message-error">
                                        {format!("Error loading challenges: {}", error_message(&e))}
                                    </p>
                                }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
            {move || {
                selected
                    .get()
                    .map(|challenge| {
                        // Stats refreshing underneath must not reset an open dialog.
                        let solved = untrack(solved_ids).contains(&challenge.id);
                        view! {
                            <ChallengeModal
                                challenge=challenge
                                solved=solved
                                on_close=close_modal
                                on_solved=finish_solve
                            />
                        }
                    })
            }}
        </div>
    }
}

#[component]
fn ChallengeCard(
    challenge: ChallengeSummary,
    solved: bool,
    #[prop(into)] on_open: Callback<ChallengeSummary>,
) -> impl IntoView {
    let rate = success_rate(challenge.points);
    let category = category_label(&challenge.category);
    let title = challenge.title.clone();
    let description = if challenge.description.is_empty() {
        "No description available".to_string()
    } else {
        challenge.description.clone()
    };
    let points = challenge.points;

    view! {
        <div class="challenge-card" class:solved=solved on:click=move |_| on_open.run(challenge.clone())>
            <div class="card-meta">
                <span class="category-badge">{category}</span>
                <span class="points">{format!("{} pts", points)}</span>
            </div>
            <h3>{title}</h3>
            <p class="card-description">{description}</p>
            <div class="success-rate">
                <span>"SUCCESS RATE"</span>
                <span>{format!("{}%", rate)}</span>
            </div>
            <div class="rate-bar">
                <div class="rate-fill" style=format!("width: {}%", rate)></div>
            </div>
            <button class="btn-primary">
                {if solved { "SOLVED" } else { "INITIALIZE SESSION" }}
            </button>
        </div>
    }
}

#[component]
fn ChallengeModal(
    challenge: ChallengeSummary,
    solved: bool,
    on_close: Callback<()>,
    /// Runs with the challenge id once the success message has been shown.
    on_solved: Callback<String>,
) -> impl IntoView {
    let flag = RwSignal::new(String::new());
    let dialog = RwSignal::new(FlagDialog::default());
    let challenge_id = challenge.id.clone();

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let candidate = flag.get();
        if !dialog.with(|d| d.can_submit(&candidate)) {
            return;
        }
        let mut started = false;
        dialog.update(|d| started = d.begin());
        if !started {
            return;
        }

        let challenge_id = challenge_id.clone();
        spawn_local(async move {
            let result = submit_flag_handler(challenge_id.clone(), candidate)
                .await
                .map_err(|e| error_message(&e));
            if let Err(e) = &result {
                error!("Flag submission failed: {}", e);
            }
            let solved = matches!(result, Ok(FlagVerdict::Solved { .. }));
            dialog.update(|d| d.finish(result));

            if solved {
                flag.set(String::new());
                TimeoutFuture::new(SOLVE_DISPLAY_DELAY_MS).await;
                on_solved.run(challenge_id);
            }
        });
    };

    let category = category_label(&challenge.category);
    let created = challenge.created_at.format("%Y-%m-%d").to_string();
    let footer_id = short_id(&challenge.id);

    view! {
        <div class="modal-overlay" on:click=move |_| on_close.run(())>
            <div class="modal" on:click=|ev| ev.stop_propagation()>
                <button class="modal-close" on:click=move |_| on_close.run(())>
                    "×"
                </button>
                <div class="card-meta">
                    <span class="category-badge">{category}</span>
                    <span class="points">{format!("{} PTS", challenge.points)}</span>
                </div>
                <h2>{challenge.title}</h2>
                <p class="description">{challenge.description}</p>
                {challenge
                    .resource_link
                    .map(|link| {
                        view! {
                            <a
                                class="resource-link"
                                href=link
                                target="_blank"
                                rel="noopener noreferrer"
                            >
                                "Download Challenge Files"
                            </a>
                        }
                    })}
                <p class="created">{format!("Added {}", created)}</p>
                {if solved {
                    view! {
                        <p class="message message-info">"You've already solved this challenge!"</p>
                    }
                        .into_any()
                } else {
                    view! {
                        <form class="flag-form" on:submit=submit>
                            <input
                                type="text"
                                placeholder="FLAG{...}"
                                prop:value=move || flag.get()
                                on:input=move |ev| flag.set(event_target_value(&ev))
                                disabled=move || dialog.with(FlagDialog::is_submitting)
                            />
                            <button
                                type="submit"
                                class="btn-primary"
                                disabled=move || {
                                    let input = flag.get();
                                    !dialog.with(|d| d.can_submit(&input))
                                }
                            >
                                {move || {
                                    if dialog.with(FlagDialog::is_submitting) {
                                        "SUBMITTING..."
                                    } else {
                                        "SUBMIT FLAG"
                                    }
                                }}
                            </button>
                        </form>
                    }
                        .into_any()
                }}
                {move || {
                    dialog
                        .with(|d| d.message.clone())
                        .map(|message| view! { <p class=message.kind.css_class()>{message.text}</p> })
                }}
                <p class="challenge-id">{format!("ID: {}", footer_id)}</p>
            </div>
        </div>
    }
}

#[component]
fn Pagination(page: RwSignal<usize>, total: usize) -> impl IntoView {
    (total > 1).then(|| {
        let current = clamp_page(page.get_untracked(), total);
        view! {
            <div class="pagination">
                <button disabled={current == 1} on:click=move |_| page.set(current.saturating_sub(1).max(1))>
                    "Prev"
                </button>
                {page_numbers(current, total)
                    .into_iter()
                    .map(|item| match item {
                        PageItem::Page(n) => {
                            view! {
                                <button class:active={n == current} on:click=move |_| page.set(n)>
                                    {n}
                                </button>
                            }
                                .into_any()
                        }
                        PageItem::Ellipsis => view! { <span class="ellipsis">"..."</span> }.into_any(),
                    })
                    .collect_view()}
                <button disabled={current == total} on:click=move |_| page.set(current + 1)>
                    "Next"
                </button>
            </div>
        }
    })
}

#[component]
fn CategorySelect(filter: RwSignal<CategoryFilter>, page: RwSignal<usize>) -> impl IntoView {
    view! {
        <select
            prop:value=move || filter.get().value()
            on:change=move |ev| {
                filter.set(CategoryFilter::from_value(&event_target_value(&ev)));
                page.set(1);
            }
        >
            <option value="ALL">"All Categories"</option>
            {Category::ALL
                .into_iter()
                .map(|c| view! { <option value=c.as_str()>{c.label()}</option> })
                .collect_view()}
        </select>
    }
}

#[component]
fn Leaderboard() -> impl IntoView {
    let board = Resource::new(|| (), |_| get_leaderboard_handler());
    let query = RwSignal::new(String::new());
    let page = RwSignal::new(1usize);

    view! {
        <div class="leaderboard">
            <header class="page-header">
                <h1>"Leaderboard"</h1>
            </header>
            <div class="filters">
                <input
                    type="search"
                    placeholder="Search teams..."
                    prop:value=move || query.get()
                    on:input=move |ev| {
                        query.set(event_target_value(&ev));
                        page.set(1);
                    }
                />
            </div>
            <Suspense fallback=|| view! { <p class="loading">"Loading leaderboard..."</p> }>
                {move || {
                    board
                        .get()
                        .map(|result| match result {
                            Ok(entries) => {
                                let filtered = filter_leaderboard(&entries, &query.get());
                                let total = total_pages(filtered.len(), LEADERBOARD_PAGE_SIZE);
                                let current = clamp_page(page.get(), total);
                                let rows = page_slice(&filtered, current, LEADERBOARD_PAGE_SIZE)
                                    .to_vec();
                                view! {
                                    <table class="board-table">
                                        <thead>
                                            <tr>
                                                <th>"RANK"</th>
                                                <th>"TEAM"</th>
                                                <th>"SOLVED"</th>
                                                <th>"SCORE"</th>
                                            </tr>
                                        </thead>
                                        <tbody>
                                            {if rows.is_empty() {
                                                view! {
                                                    <tr>
                                                        <td colspan="4" class="empty">
                                                            "No teams found"
                                                        </td>
                                                    </tr>
                                                }
                                                    .into_any()
                                            } else {
                                                rows.into_iter()
                                                    .map(|entry| {
                                                        view! {
                                                            <tr>
                                                                <td class=rank_class(entry.rank)>
                                                                    {(entry.rank <= 3)
                                                                        .then(|| view! { <span class="trophy">"🏆"</span> })}
                                                                    {entry.rank}
                                                                </td>
                                                                <td>{entry.team_name}</td>
                                                                <td>
                                                                    {format!(
                                                                        "{} / {}",
                                                                        entry.solved_count,
                                                                        entry.total_challenges,
                                                                    )}
                                                                </td>
                                                                <td class="score">{entry.score}</td>
                                                            </tr>
                                                        }
                                                    })
                                                    .collect_view()
                                                    .into_any()
                                            }}
                                        </tbody>
                                    </table>
                                    <Pagination page=page total=total />
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! {
                                    <p class="message message-error">
                                        {format!("Error loading leaderboard: {}", error_message(&e))}
                                    </p>
                                }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
        </div>
    }
}

#[component]
fn Logs() -> impl IntoView {
    let logs = Resource::new(|| (), |_| get_submission_logs_handler());
    let query = RwSignal::new(String::new());
    let category = RwSignal::new(CategoryFilter::All);
    let page = RwSignal::new(1usize);

    view! {
        <div class="logs">
            <header class="page-header">
                <h1>"Submission Logs"</h1>
                <button class="btn-secondary" on:click=move |_| logs.refetch()>
                    "Refresh"
                </button>
            </header>
            <div class="filters">
                <input
                    type="search"
                    placeholder="Search by team name..."
                    prop:value=move || query.get()
                    on:input=move |ev| {
                        query.set(event_target_value(&ev));
                        page.set(1);
                    }
                />
                <CategorySelect filter=category page=page />
            </div>
            <Suspense fallback=|| view! { <p class="loading">"Loading logs..."</p> }>
                {move || {
                    logs.get()
                        .map(|result| match result {
                            Ok(entries) => {
                                let filtered = filter_logs(&entries, &query.get(), category.get());
                                let total = total_pages(filtered.len(), LOGS_PAGE_SIZE);
                                let current = clamp_page(page.get(), total);
                                let rows = page_slice(&filtered, current, LOGS_PAGE_SIZE).to_vec();
                                view! {
                                    <p class="result-count">
                                        {format!(
                                            "Showing {} of {} submissions",
                                            filtered.len(),
                                            entries.len(),
                                        )}
                                    </p>
                                    <table class="log-table">
                                        <thead>
                                            <tr>
                                                <th>"TIME"</th>
                                                <th>"TEAM"</th>
                                                <th>"CHALLENGE"</th>
                                                <th>"CATEGORY"</th>
                                                <th>"RESULT"</th>
                                            </tr>
                                        </thead>
                                        <tbody>
                                            {if rows.is_empty() {
                                                view! {
                                                    <tr>
                                                        <td colspan="5" class="empty">
                                                            "No submissions found"
                                                        </td>
                                                    </tr>
                                                }
                                                    .into_any()
                                            } else {
                                                rows.into_iter()
                                                    .map(|entry| {
                                                        let (class, label) = if entry.is_correct {
                                                            ("result correct", "CORRECT")
                                                        } else {
                                                            ("result incorrect", "INCORRECT")
                                                        };
                                                        view! {
                                                            <tr>
                                                                <td>{format_timestamp(&entry.submitted_at)}</td>
                                                                <td>{entry.team_name}</td>
                                                                <td>{entry.challenge_title}</td>
                                                                <td>{category_label(&entry.challenge_category)}</td>
                                                                <td class=class>{label}</td>
                                                            </tr>
                                                        }
                                                    })
                                                    .collect_view()
                                                    .into_any()
                                            }}
                                        </tbody>
                                    </table>
                                    <Pagination page=page total=total />
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! {
                                    <p class="message message-error">
                                        {format!("Error loading logs: {}", error_message(&e))}
                                    </p>
                                }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
        </div>
    }
}

#[component]
fn ChallengeManager() -> impl IntoView {
    let challenges = Resource::new(|| (), |_| get_admin_challenges());
    let form = RwSignal::new(ChallengeForm::default());
    let saving = RwSignal::new(false);
    let form_error = RwSignal::new(String::new());

    let query = RwSignal::new(String::new());
    let category = RwSignal::new(CategoryFilter::All);
    let page = RwSignal::new(1usize);

    // Validates locally first; the server validates again.
    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        if saving.get() {
            return;
        }
        let draft = form.get();
        if let Err(e) = draft.validate() {
            form_error.set(e.to_string());
            return;
        }
        saving.set(true);
        form_error.set(String::new());
        spawn_local(async move {
            match create_challenge_handler(draft).await {
                Ok(challenge) => {
                    log!("Added challenge {}", challenge.title);
                    form.set(ChallengeForm::default());
                    challenges.refetch();
                    alert("Challenge added successfully!");
                }
                Err(e) => {
                    let message = error_message(&e);
                    form_error.set(message.clone());
                    alert(&format!("Error adding challenge: {}", message));
                }
            }
            saving.set(false);
        });
    };

    let delete = move |challenge_id: String| {
        if !confirm("Are you sure you want to delete this challenge?") {
            return;
        }
        spawn_local(async move {
            match delete_challenge_handler(challenge_id).await {
                Ok(()) => {
                    challenges.refetch();
                    alert("Challenge deleted successfully");
                }
                Err(e) => alert(&format!("Error deleting challenge: {}", error_message(&e))),
            }
        });
    };

    view! {
        <div class="challenge-manager">
            <header class="page-header">
                <h1>"Challenge Manager"</h1>
            </header>
            <form class="admin-form" on:submit=submit>
                <label>
                    "Challenge Title"
                    <input
                        type="text"
                        placeholder="BROKEN_RSA_PADDING"
                        prop:value=move || form.with(|f| f.title.clone())
                        on:input=move |ev| form.update(|f| f.title = event_target_value(&ev))
                    />
                </label>
                <label>
                    "Category"
                    <select
                        prop:value=move || form.with(|f| f.category.clone())
                        on:change=move |ev| form.update(|f| f.category = event_target_value(&ev))
                    >
                        <option value="">"Select category"</option>
                        {Category::ALL
                            .into_iter()
                            .map(|c| view! { <option value=c.as_str()>{c.label()}</option> })
                            .collect_view()}
                    </select>
                </label>
                <label>
                    "Points"
                    <input
                        type="number"
                        min="0"
                        placeholder="500"
                        prop:value=move || form.with(|f| f.points.clone())
                        on:input=move |ev| form.update(|f| f.points = event_target_value(&ev))
                    />
                </label>
                <label>
                    "Description"
                    <textarea
                        placeholder="Describe the challenge..."
                        prop:value=move || form.with(|f| f.description.clone())
                        on:input=move |ev| form.update(|f| f.description = event_target_value(&ev))
                    ></textarea>
                </label>
                <label>
                    "Resource Link (optional)"
                    <input
                        type="url"
                        placeholder="https://..."
                        prop:value=move || form.with(|f| f.resource_link.clone())
                        on:input=move |ev| {
                            form.update(|f| f.resource_link = event_target_value(&ev))
                        }
                    />
                </label>
                <label>
                    "Flag"
                    <input
                        type="text"
                        placeholder="FLAG{...}"
                        prop:value=move || form.with(|f| f.flag.clone())
                        on:input=move |ev| form.update(|f| f.flag = event_target_value(&ev))
                    />
                </label>
                {move || {
                    (!form_error.get().is_empty())
                        .then(|| view! { <p class="message message-error">{form_error.get()}</p> })
                }}
                <button type="submit" class="btn-primary" disabled=move || saving.get()>
                    {move || if saving.get() { "ADDING..." } else { "ADD CHALLENGE" }}
                </button>
            </form>

            <div class="filters">
                <input
                    type="search"
                    placeholder="Search challenges..."
                    prop:value=move || query.get()
                    on:input=move |ev| {
                        query.set(event_target_value(&ev));
                        page.set(1);
                    }
                />
                <CategorySelect filter=category page=page />
            </div>
            <Suspense fallback=|| view! { <p class="loading">"Loading challenges..."</p> }>
                {move || {
                    challenges
                        .get()
                        .map(|result| match result {
                            Ok(list) => {
                                let filtered = filter_challenges(&list, &query.get(), category.get());
                                let total = total_pages(filtered.len(), CHALLENGES_PAGE_SIZE);
                                let current = clamp_page(page.get(), total);
                                let rows = page_slice(&filtered, current, CHALLENGES_PAGE_SIZE)
                                    .to_vec();
                                view! {
                                    <p class="result-count">
                                        {format!("{} challenges", filtered.len())}
                                    </p>
                                    <div class="admin-challenges">
                                        {if rows.is_empty() {
                                            view! { <p class="empty">"No challenges found"</p> }
                                                .into_any()
                                        } else {
                                            rows.into_iter()
                                                .map(|challenge| {
                                                    let id = challenge.id.clone();
                                                    view! {
                                                        <div class="admin-challenge">
                                                            <div class="card-meta">
                                                                <span class="category-badge">
                                                                    {category_label(&challenge.category)}
                                                                </span>
                                                                <span class="points">
                                                                    {format!("{} pts", challenge.points)}
                                                                </span>
                                                            </div>
                                                            <h3>{challenge.title}</h3>
                                                            <p class="card-description">
                                                                {challenge.description}
                                                            </p>
                                                            <button
                                                                class="btn-danger"
                                                                on:click=move |_| delete(id.clone())
                                                            >
                                                                "Delete"
                                                            </button>
                                                        </div>
                                                    }
                                                })
                                                .collect_view()
                                                .into_any()
                                        }}
                                    </div>
                                    <Pagination page=page total=total />
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! {
                                    <p class="message message-error">
                                        {format!("Error loading challenges: {}", error_message(&e))}
                                    </p>
                                }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_bounds() {
        assert_eq!(success_rate(0), 100);
        assert_eq!(success_rate(250), 75);
        assert_eq!(success_rate(900), 10);
        assert_eq!(success_rate(5000), 10);
    }

    #[test]
    fn test_rank_class() {
        assert_eq!(rank_class(1), "rank rank-gold");
        assert_eq!(rank_class(3), "rank rank-bronze");
        assert_eq!(rank_class(4), "rank");
    }

    #[test]
    fn test_display_helpers() {
        assert_eq!(category_label("REVERSE"), "REVERSE ENGINEERING");
        assert_eq!(category_label("WEB"), "WEB");
        assert_eq!(category_label("legacy"), "legacy");

        assert_eq!(short_id("0f8e2c1a-77aa-4d3b-9f00-123456789abc"), "0f8e2c1a");
        assert_eq!(short_id("abc"), "abc");

        let at = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        assert_eq!(format_timestamp(&at), "1970-01-01 00:00:00");
    }

    #[test]
    fn test_solve_only_closes_its_own_dialog() {
        let summary = |id: &str| ChallengeSummary {
            id: id.to_string(),
            title: "Warmup".to_string(),
            category: "MISC".to_string(),
            points: 50,
            description: String::new(),
            resource_link: None,
            created_at: NaiveDateTime::default(),
        };
        let first = summary("first-id");
        let second = summary("second-id");

        assert!(is_open(Some(&first), "first-id"));
        // The first dialog was closed and the second opened before the delay ran out.
        assert!(!is_open(Some(&second), "first-id"));
        assert!(!is_open(None, "first-id"));
    }

    #[test]
    fn test_error_message_unwraps_server_errors() {
        let e = ServerFnError::<NoCustomError>::ServerError("Invalid email or password".to_string());
        assert_eq!(error_message(&e), "Invalid email or password");
    }
}
