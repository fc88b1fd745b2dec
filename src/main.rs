use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picnode::assets::AssetGallery;
use picnode::backend::{Backend, BackendClient};
use picnode::checkout::{
    AuthForm, CardForm, CheckoutFlow, CheckoutStep, CheckoutTiming, ClaimOutcome, PaymentMethod,
};
use picnode::config::{self, Config};
use picnode::errors::AppError;
use picnode::models::asset::Category;
use picnode::models::token::TokenConfig;
use picnode::models::user::{Credentials, ProfileUpdate, Registration};
use picnode::playground::openapi::OpenApiDocument;
use picnode::playground::settings::PlaygroundSettings;
use picnode::playground::Playground;
use picnode::preferences::Preferences;
use picnode::session::Session;
use picnode::store::{FileStore, KeyValueStore};
use picnode::{calculator, dashboard};

mod cli;

/// Service objects shared by every command.
struct Services {
    config: Config,
    http: reqwest::Client,
    backend: Arc<dyn Backend>,
    session: Session,
    settings: PlaygroundSettings,
    preferences: Preferences,
}

impl Services {
    fn build(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(&config.storage_path).context("failed to open local storage")?,
        );
        let backend: Arc<dyn Backend> = Arc::new(BackendClient::new(&config)?);
        let http = config::http_client(&config)?;

        Ok(Self {
            http,
            session: Session::new(backend.clone(), store.clone()),
            settings: PlaygroundSettings::load(store.clone()),
            preferences: Preferences::new(store).with_default_language(&config.locale),
            backend,
            config,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "picnode=info".into()),
    );
    let json_logs = std::env::var("PICNODE_LOG_FORMAT").as_deref() == Ok("json");
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let cfg = config::load()?;
    let args = cli::Cli::parse();
    let services = Services::build(cfg)?;

    let result = run(args.command, &services, args.json).await;

    if let Err(ref e) = result {
        match e.downcast_ref::<AppError>() {
            Some(app) if args.json => eprintln!("{}", app.envelope()),
            Some(app) => {
                eprintln!("Error: {}", app);
                for (field, messages) in app.field_errors() {
                    for m in messages {
                        eprintln!("  {}: {}", field, m);
                    }
                }
            }
            None => eprintln!("Error: {:?}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}

fn token_config(args: &cli::TokenConfigArgs) -> anyhow::Result<TokenConfig> {
    let mut state = calculator::CalculatorState {
        validity: args.validity,
        limit_type: args.limit_type.parse()?,
        rate_limit: args.rate_limit,
        total_requests: args.total_requests,
        ..Default::default()
    };
    for api in &args.apis {
        let category: Category = api.parse()?;
        state.apis.insert(category.slug().to_string());
    }
    Ok(state.build()?)
}

async fn run(cmd: cli::Commands, s: &Services, json: bool) -> anyhow::Result<()> {
    use cli::Commands;

    match cmd {
        Commands::Login { email, password } => {
            let user = s.session.login(&Credentials { email, password }).await?;
            print(json, &user, || println!("Logged in as {} <{}>", user.name, user.email))?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let user = s
                .session
                .register(&Registration {
                    name,
                    email,
                    password_confirmation: password.clone(),
                    password,
                })
                .await?;
            print(json, &user, || {
                println!("Account created for {}. Run `picnode login` to continue.", user.email)
            })?;
        }
        Commands::Logout => {
            s.session.logout().await?;
            println!("Logged out.");
        }
        Commands::Whoami => {
            let user = s.session.refresh_user().await?;
            print(json, &user, || {
                let verified = if user.is_verified() { "verified" } else { "unverified" };
                println!("{} <{}> ({})", user.name, user.email, verified)
            })?;
        }
        Commands::Quote { config } => {
            let config = token_config(&config)?;
            let quote = calculator::quote(s.backend.as_ref(), &config).await?;
            print(json, &quote, || {
                if quote.free {
                    println!("Free ({} {:.2})", quote.currency, quote.total)
                } else {
                    println!("{} {:.2}", quote.currency, quote.total)
                }
            })?;
        }
        Commands::Checkout {
            config,
            method,
            email,
            password,
            register_name,
            card_holder,
            card_number,
            card_expiry,
            card_cvv,
        } => {
            let config = token_config(&config)?;
            let method: PaymentMethod = method.parse()?;
            let quote = calculator::quote(s.backend.as_ref(), &config).await?;

            let mut flow = CheckoutFlow::open(
                s.session.clone(),
                config,
                CheckoutTiming::from(&s.config),
            )
            .with_amount(quote.total);

            if flow.step() == CheckoutStep::Auth {
                let email = email.context("--email is required when not logged in")?;
                let password = password.context("--password is required when not logged in")?;
                let form = match register_name {
                    Some(name) => AuthForm::Register(Registration {
                        name,
                        email,
                        password_confirmation: password.clone(),
                        password,
                    }),
                    None => AuthForm::Login(Credentials { email, password }),
                };
                flow.authenticate(form).await?;
            }

            flow.select_method(method)?;
            let outcome = match method {
                PaymentMethod::Card => {
                    let card = CardForm {
                        holder: card_holder.unwrap_or_default(),
                        number: card_number.unwrap_or_default(),
                        expiry: card_expiry.unwrap_or_default(),
                        cvv: card_cvv.unwrap_or_default(),
                    };
                    eprintln!("Processing card payment...");
                    flow.pay_with_card(&card).await?.clone()
                }
                PaymentMethod::Pix => {
                    if let Some(charge) = flow.pix_charge() {
                        eprintln!("Pix code (copy and paste):\n{}\n", charge.code());
                        eprintln!("Waiting for confirmation ({}s)...", charge.remaining_secs());
                    }
                    flow.await_pix_confirmation().await?.clone()
                }
            };
            flow.close();

            print(json, &outcome, || match &outcome {
                ClaimOutcome::Created { token } => {
                    println!("Token created. Store it now, it will not be shown again:");
                    println!("  {}", token.token.as_deref().unwrap_or("(not returned)"));
                }
                ClaimOutcome::AlreadyClaimed => {
                    println!("You have already claimed your free order.")
                }
                ClaimOutcome::Failed { message } => println!("Token creation failed: {}", message),
            })?;
        }
        Commands::Tokens => {
            let tokens = dashboard::tokens(&s.session).await?;
            print(json, &tokens, || {
                if tokens.is_empty() {
                    println!("No tokens found.");
                    return;
                }
                println!("{:<10} {:<20} {:<22} APIS", "ID", "NAME", "EXPIRES");
                for t in &tokens {
                    println!(
                        "{:<10} {:<20} {:<22} {}",
                        t.id.to_string().trim_matches('"'),
                        t.name.as_deref().unwrap_or("-"),
                        t.expires_at.as_deref().unwrap_or("-"),
                        t.apis.join(",")
                    );
                }
            })?;
        }
        Commands::Orders => {
            let orders = dashboard::orders(&s.session).await?;
            print(json, &orders, || {
                if orders.is_empty() {
                    println!("No orders found.");
                    return;
                }
                println!("{:<10} {:<12} {:<12} CREATED", "ID", "STATUS", "TOTAL");
                for o in &orders {
                    println!(
                        "{:<10} {:<12} {:<12} {}",
                        o.id.to_string().trim_matches('"'),
                        o.status.as_deref().unwrap_or("-"),
                        o.total.map(|t| format!("{:.2}", t)).unwrap_or_else(|| "-".into()),
                        o.created_at.as_deref().unwrap_or("-")
                    );
                }
            })?;
        }
        Commands::Dashboard => {
            let view = dashboard::load(&s.session).await?;
            print(json, &view, || {
                println!("{} <{}>", view.user.name, view.user.email);
                println!("  tokens: {}", view.tokens.len());
                println!("  orders: {}", view.orders.len());
            })?;
        }
        Commands::Profile { name, email } => {
            let user = s.session.update_profile(&ProfileUpdate { name, email }).await?;
            print(json, &user, || println!("Profile updated: {} <{}>", user.name, user.email))?;
        }
        Commands::VerifyEmail => {
            s.session.send_verification_email().await?;
            println!("Verification email sent.");
        }
        Commands::Docs { tag } => {
            let doc = OpenApiDocument::load(&s.config.openapi_url, &s.http).await?;
            println!("{} {}", doc.title, doc.version);
            for (group, ops) in doc.by_tag() {
                if tag.as_deref().is_some_and(|t| t != group) {
                    continue;
                }
                println!("\n[{}]", group);
                for op in ops {
                    println!(
                        "  {:<7} {:<40} {}",
                        op.method,
                        op.path,
                        op.summary.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Commands::Call {
            method,
            path,
            params,
            token,
            mode,
        } => {
            let doc = OpenApiDocument::load(&s.config.openapi_url, &s.http).await?;
            let op = doc
                .find(&method, &path)
                .ok_or_else(|| AppError::InvalidInput(format!("no documented operation {} {}", method, path)))?
                .clone();

            let settings = match mode {
                None => s.settings.clone(),
                // A one-off override must not touch the persisted mode.
                Some(m) => {
                    let scratch = PlaygroundSettings::load(Arc::new(picnode::store::MemoryStore::new()));
                    let current = s.settings.snapshot();
                    scratch.set_token(&current.token)?;
                    scratch.set_server_url(&current.server_url)?;
                    scratch.set_live_mode(matches!(m, cli::ModeArg::Live))?;
                    scratch
                }
            };

            let mut playground = Playground::new(
                s.http.clone(),
                settings,
                s.preferences.language(),
                s.config.mock_delay,
            );
            let values: BTreeMap<String, String> = params.into_iter().collect();
            let response = playground
                .execute(&doc, &op, &values, token.as_deref())
                .await?;

            print(json, response, || {
                println!("{} {} ({} ms)", response.status, response.status_text, response.elapsed_ms);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response.data).unwrap_or_default()
                );
            })?;
        }
        Commands::Settings { command } => {
            use cli::SettingsCommands;
            match command {
                Some(SettingsCommands::Token { value }) => s.settings.set_token(&value)?,
                Some(SettingsCommands::Server { url }) => s.settings.set_server_url(&url)?,
                Some(SettingsCommands::Mode { mode }) => {
                    s.settings.set_live_mode(matches!(mode, cli::ModeArg::Live))?
                }
                None => {}
            }
            let state = s.settings.snapshot();
            print(json, &state, || {
                let token = if state.token.is_empty() { "(none)" } else { "(set)" };
                let server = if state.server_url.is_empty() { "(document default)" } else { state.server_url.as_str() };
                println!("token:  {}", token);
                println!("server: {}", server);
                println!("mode:   {}", if state.live_mode { "live" } else { "mock" });
            })?;
        }
        Commands::Assets {
            category,
            search,
            pages,
        } => {
            let category: Category = category.parse()?;
            let gallery = AssetGallery::new(s.backend.clone(), category, std::time::Duration::ZERO);
            match search {
                Some(term) => gallery.set_search(&term).await?,
                None => gallery.refresh().await?,
            };
            for _ in 1..pages {
                gallery.load_more().await?;
            }

            let snapshot = gallery.snapshot().await;
            print(json, &snapshot, || {
                for a in &snapshot.assets {
                    println!(
                        "{:<8} {:<8} {:<32} {}",
                        a.id,
                        a.kind,
                        a.name,
                        a.image_url.as_deref().unwrap_or("-")
                    );
                }
                println!(
                    "\npage {}{}",
                    snapshot.page,
                    if snapshot.has_more { " (more available)" } else { "" }
                );
            })?;
        }
        Commands::Prefs { language, theme } => {
            if let Some(language) = language {
                s.preferences.set_language(&language)?;
            }
            if let Some(theme) = theme {
                s.preferences.set_theme(theme.parse()?)?;
            }
            println!("language: {}", s.preferences.language());
            println!("theme:    {}", s.preferences.theme().as_str());
        }
    }
    Ok(())
}
