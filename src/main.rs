#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use axum::Router;
    use ctf_board::app::*;
    use ctf_board::config::Config;
    use ctf_board::store::DbStore;
    use ctf_board::{build_pool, delete_expired_sessions, run_migrations};
    use leptos::logging::log;
    use leptos::prelude::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};

    let config = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));

    let pool = build_pool(&config.database_url).expect("Failed to create pool.");
    {
        let mut conn = pool.get().expect("Failed to get a database connection.");
        run_migrations(&mut conn).expect("Failed to run migrations.");
        let expired = delete_expired_sessions(&mut conn).expect("Failed to clear sessions.");
        if expired > 0 {
            log!("Removed {} expired sessions", expired);
        }
    }
    let store = DbStore::new(pool);

    let conf = get_configuration(None).unwrap();
    let addr = conf.leptos_options.site_addr;
    let leptos_options = conf.leptos_options;
    let routes = generate_route_list(App);

    let leptos_options_clone = leptos_options.clone();
    let app = Router::new()
        .leptos_routes_with_context(
            &leptos_options,
            routes,
            // Server functions reach the database and settings through context.
            move || {
                provide_context(store.clone());
                provide_context(config.clone());
            },
            move || shell(leptos_options_clone.clone()),
        )
        .fallback(leptos_axum::file_and_error_handler(shell))
        .with_state(leptos_options.clone());

    log!("listening on http://{}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

#[cfg(not(feature = "ssr"))]
pub fn main() {
    // Hydration entry point is `hydrate` in lib.rs.
}
