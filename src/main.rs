use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use serde_json::Value;

use matchbook::auth::admin_sign_in;
use matchbook::config::ClientConfig;
use matchbook::guard::{self, Verdict};
use matchbook::notifications::route_for;
use matchbook::route::Route;
use matchbook::session::ApprovalWatch;
use matchbook::{AuthError, Client, ClientError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("[{code}] {0}", code = .0.error_code())]
    Auth(#[from] AuthError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("stdin read failed: {0}")]
    Stdin(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "matchbook", about = "matchbook session and access-control client")]
struct Cli {
    /// Anti-abuse verifier token, good for one code request.
    #[arg(long, env = "MATCHBOOK_RECAPTCHA_TOKEN")]
    recaptcha_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a phone number and one-time code.
    Login {
        phone: String,
        /// One-time code; prompted for when omitted.
        #[arg(long)]
        code: Option<String>,
    },
    /// Create an account with an invite code.
    Register {
        #[arg(long)]
        invite: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        code: Option<String>,
    },
    /// Sign in to the admin console.
    AdminLogin {
        email: String,
        #[arg(long, env = "MATCHBOOK_ADMIN_PASSWORD")]
        password: String,
    },
    /// Print the current session.
    Whoami,
    /// Evaluate the route guards for a path.
    Route { path: String },
    /// Follow approval and notifications until interrupted.
    Watch {
        /// Also load the full notification list on start.
        #[arg(long, default_value_t = false)]
        list: bool,
    },
    /// Sign out and forget the saved session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().map_err(ClientError::from)?;
    let client = Client::new(config, cli.recaptcha_token)?;
    let result = run(&client, cli.command).await;
    client.shutdown();
    result
}

async fn run(client: &Client, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { phone, code } => run_login(client, &phone, code).await,
        Command::Register { invite, phone, first_name, last_name, code } => {
            run_register(client, &invite, &phone, &first_name, &last_name, code).await
        }
        Command::AdminLogin { email, password } => {
            client.start().await;
            let landing = admin_sign_in(client.gateway(), &email, &password).await?;
            println!("signed in; go to {landing}");
            Ok(())
        }
        Command::Whoami => {
            let snapshot = client.start().await;
            print_json(&serde_json::to_value(&snapshot)?)
        }
        Command::Route { path } => {
            let snapshot = client.start().await;
            let route = Route::parse(&path);
            match guard::evaluate(&snapshot, &route) {
                Verdict::Loading => println!("{route}: loading"),
                Verdict::Render => println!("{route}: render"),
                Verdict::Redirect(to) => println!("{route}: redirect to {to}"),
            }
            Ok(())
        }
        Command::Watch { list } => run_watch(client, list).await,
        Command::Logout => {
            client.start().await;
            client.session().sign_out().await?;
            println!("signed out");
            Ok(())
        }
    }
}

async fn run_login(client: &Client, phone: &str, code: Option<String>) -> Result<(), CliError> {
    client.start().await;
    let challenge = client.gateway().send_code(phone).await?;
    let code = match code {
        Some(code) => code,
        None => prompt("verification code: ")?,
    };
    let sign_in = client.gateway().confirm_code(&challenge, &code).await?;
    println!("signed in as {}; go to {}", sign_in.identity.uid, sign_in.landing);
    Ok(())
}

async fn run_register(
    client: &Client,
    invite: &str,
    phone: &str,
    first_name: &str,
    last_name: &str,
    code: Option<String>,
) -> Result<(), CliError> {
    client.start().await;
    let mut registration = client.registration();
    registration.validate_invite(invite).await?;
    registration.send_code(phone).await?;
    let code = match code {
        Some(code) => code,
        None => prompt("verification code: ")?,
    };
    registration.confirm_code(&code).await?;
    let next = registration.register(first_name, last_name).await?;
    println!("registered; go to {next}");
    Ok(())
}

async fn run_watch(client: &Client, list: bool) -> Result<(), CliError> {
    let snapshot = client.start().await;
    if !snapshot.is_authenticated() {
        return Err(CliError::NotSignedIn);
    }

    if snapshot.is_pending() {
        let approval = client.approval_watch();
        let mut approved = approval.subscribe();
        approval.start();
        println!("waiting for approval");
        tokio::select! {
            _ = approved.wait_for(|a| *a) => println!("approved; go to {}", ApprovalWatch::next_route()),
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }

    let sync = client.notifications();
    if list {
        sync.fetch_notifications().await;
        for item in sync.inbox().notifications {
            let target = route_for(&item).map_or_else(|| "-".to_owned(), |r| r.to_string());
            println!("{} [{}] {} -> {target}", if item.is_read { " " } else { "*" }, item.id, item.title);
        }
    }

    let mut inbox = sync.subscribe();
    loop {
        println!("unread: {}", inbox.borrow_and_update().unread_count);
        tokio::select! {
            changed = inbox.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

fn prompt(label: &str) -> Result<String, CliError> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
