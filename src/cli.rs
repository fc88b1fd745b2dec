use clap::{Parser, Subcommand, ValueEnum};

/// PicNode: buy API tokens, browse the API and try it out
#[derive(Parser)]
#[command(name = "picnode", version, about)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Clone)]
pub struct TokenConfigArgs {
    /// Validity in days (minimum 7)
    #[arg(long, default_value = "30")]
    pub validity: u32,
    /// rate-limit or total-requests
    #[arg(long, default_value = "rate-limit")]
    pub limit_type: String,
    /// Requests per minute
    #[arg(long, default_value = "60")]
    pub rate_limit: u32,
    /// Request quota over the token lifetime
    #[arg(long, default_value = "1000")]
    pub total_requests: u32,
    /// Comma-separated API slugs (places,football-clubs,thing-icos,companies)
    #[arg(long, value_delimiter = ',', required = true)]
    pub apis: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Live,
    Mock,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PICNODE_PASSWORD")]
        password: String,
    },

    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PICNODE_PASSWORD")]
        password: String,
    },

    /// End the session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Price a token configuration
    Quote {
        #[command(flatten)]
        config: TokenConfigArgs,
    },

    /// Buy a token: authenticate if needed, pay (simulated), and claim it
    Checkout {
        #[command(flatten)]
        config: TokenConfigArgs,
        /// card or pix
        #[arg(long, default_value = "pix")]
        method: String,
        /// Email, when no session is cached
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "PICNODE_PASSWORD")]
        password: Option<String>,
        /// Register a new account with this name before logging in
        #[arg(long)]
        register_name: Option<String>,
        #[arg(long)]
        card_holder: Option<String>,
        #[arg(long)]
        card_number: Option<String>,
        /// MM/YY
        #[arg(long)]
        card_expiry: Option<String>,
        #[arg(long)]
        card_cvv: Option<String>,
    },

    /// List your API tokens
    Tokens,

    /// List your orders
    Orders,

    /// Show user, tokens and orders together
    Dashboard,

    /// Update profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Resend the email verification link
    VerifyEmail,

    /// List documented operations
    Docs {
        /// Only show operations with this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Execute a documented operation in the playground
    Call {
        /// HTTP method, e.g. GET
        method: String,
        /// Path template as documented, e.g. /places/{id}
        path: String,
        /// Parameter values as name=value
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
        /// Bearer token for this request only
        #[arg(long)]
        token: Option<String>,
        /// Override the stored live/mock mode for this call
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Show or change playground settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },

    /// Browse catalog assets
    Assets {
        /// places, football-clubs, thing-icos or companies
        category: String,
        #[arg(long)]
        search: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Show or change language and theme
    Prefs {
        #[arg(long)]
        language: Option<String>,
        /// light or dark
        #[arg(long)]
        theme: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Set the shared bearer token
    Token { value: String },
    /// Set the server URL requests go to
    Server { url: String },
    /// Switch between live and mock mode
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    Ok((k.trim().to_string(), v.to_string()))
}
