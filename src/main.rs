//!
//! dashboard-gate CLI
//! ------------------
//! Operator tool around the session gate: issue and inspect sealed credentials,
//! ask the authorizer about a path, print a role's menu, and sign in against the
//! backend. Configuration comes from `--config <file.json>` and `DASHBOARD_*`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dashboard_gate::access::{check_path, dashboard_routes, menu_for, nav_data, NoopNavigator};
use dashboard_gate::client::ApiClient;
use dashboard_gate::identity::{
    decode_claims, now_secs, Claims, CredentialCipher, FileSessionStore, MemorySessionStore, Role, SessionResolver,
    SessionStore, TokenIssuer,
};
use dashboard_gate::AuthConfig;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file.json>] <command> [args]\n\nCommands:\n  seal <token>                          seal a compact token with the shared secret\n  issue --id <id> --email <e> --first <f> --last <l> --role <r> [--ttl <secs>] [--signing-key <k>]\n                                        sign claims into a token and seal it\n  inspect [<blob>]                      open a blob (default: the stored credential) and show its claims\n  check <role|-> <path>                 authorizer decision for a path ('-' means no session)\n  menu <role>                           role-filtered navigation menu\n  login <dni> <password>                sign in against DASHBOARD_API_URL and store the credential\n  logout                                clear the stored credential\n\nEnvironment:\n  DASHBOARD_PASS_SECRET   shared secret for sealing credentials\n  DASHBOARD_API_URL       backend base URL (default http://localhost:3000)\n  DASHBOARD_STORAGE_KEY   credential storage key (default token)\n  DASHBOARD_STORE_DIR     directory for the credential store (default: in-memory)\n  RUST_LOG                log filter (default info)"
    );
}

fn parse_role(s: &str) -> Result<Option<Role>> {
    if s == "-" {
        return Ok(None);
    }
    s.parse::<Role>().map(Some).map_err(|e| anyhow!(e.to_string()))
}

fn open_store(cfg: &AuthConfig) -> Result<Arc<dyn SessionStore>> {
    Ok(match &cfg.store_dir {
        Some(dir) => Arc::new(FileSessionStore::new(dir).map_err(|e| anyhow!(e.to_string()))?),
        None => Arc::new(MemorySessionStore::new()),
    })
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter().position(|a| a == name).and_then(|i| args.get(i + 1)).cloned()
}

fn required_flag(args: &[String], name: &str) -> Result<String> {
    flag_value(args, name).ok_or_else(|| anyhow!("{} is required", name))
}

fn issue(cfg: &AuthConfig, args: &[String]) -> Result<()> {
    let ttl = flag_value(args, "--ttl").map(|v| v.parse::<i64>()).transpose().context("--ttl must be seconds")?.unwrap_or(3600);
    let role = required_flag(args, "--role")?;
    role.parse::<Role>().map_err(|e| anyhow!(e.to_string()))?;
    let claims = Claims {
        id: required_flag(args, "--id")?,
        email: required_flag(args, "--email")?,
        first_name: required_flag(args, "--first")?,
        last_name: required_flag(args, "--last")?,
        role,
        exp: now_secs() + ttl,
    };
    let signing_key = flag_value(args, "--signing-key").unwrap_or_else(|| cfg.secret.clone());
    let token = TokenIssuer::new(signing_key).issue(&claims).map_err(|e| anyhow!(e.to_string()))?;
    let blob = CredentialCipher::new(&cfg.secret).seal(&token).map_err(|e| anyhow!(e.to_string()))?;
    println!("{}", blob);
    Ok(())
}

fn inspect(cfg: &AuthConfig, blob: Option<&String>) -> Result<()> {
    let store = open_store(cfg)?;
    let blob = match blob {
        Some(b) => b.clone(),
        None => store.get(&cfg.storage_key).ok_or_else(|| anyhow!("no credential stored under '{}'", cfg.storage_key))?,
    };
    let now = now_secs();
    let out = match CredentialCipher::new(&cfg.secret).open(&blob).and_then(|t| decode_claims(&t)) {
        Ok(claims) => json!({
            "valid": !claims.is_expired_at(now) && claims.role.parse::<Role>().is_ok(),
            "expired": claims.is_expired_at(now),
            "expires_in_secs": claims.exp - now,
            "claims": claims,
        }),
        Err(e) => json!({ "valid": false, "reason": e.reason(), "detail": e.to_string() }),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let mut config_file: Option<PathBuf> = None;
    if args.first().map(|a| a == "--config").unwrap_or(false) {
        if args.len() < 2 {
            eprintln!("--config requires a path");
            print_usage(&program);
            std::process::exit(2);
        }
        config_file = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }
    let cfg = AuthConfig::load(config_file.as_deref()).map_err(|e| anyhow!(e.to_string()))?;

    let Some(command) = args.first().cloned() else {
        print_usage(&program);
        std::process::exit(2);
    };
    let rest = &args[1..];

    match command.as_str() {
        "seal" => {
            let token = rest.first().ok_or_else(|| anyhow!("seal requires a token"))?;
            let blob = CredentialCipher::new(&cfg.secret).seal(token).map_err(|e| anyhow!(e.to_string()))?;
            println!("{}", blob);
        }
        "issue" => issue(&cfg, rest)?,
        "inspect" => inspect(&cfg, rest.first())?,
        "check" => {
            let (Some(role), Some(path)) = (rest.first(), rest.get(1)) else {
                return Err(anyhow!("check requires <role|-> <path>"));
            };
            let decision = check_path(dashboard_routes(), parse_role(role)?, path);
            println!("{}", serde_json::to_string(&decision)?);
        }
        "menu" => {
            let role = parse_role(rest.first().map(String::as_str).unwrap_or("-"))?;
            let menu = menu_for(dashboard_routes(), role, nav_data());
            println!("{}", serde_json::to_string_pretty(&menu)?);
        }
        "login" => {
            let (Some(dni), Some(password)) = (rest.first(), rest.get(1)) else {
                return Err(anyhow!("login requires <dni> <password>"));
            };
            let resolver = SessionResolver::new(&cfg, open_store(&cfg)?, Arc::new(NoopNavigator));
            let client = ApiClient::new(&cfg.api_url).map_err(|e| anyhow!(e.to_string()))?;
            let identity = client.sign_in(&resolver, dni, password).await.map_err(|e| anyhow!(e.to_json_string()))?;
            info!(target: "cli", "signed in as {} ({})", identity.display_name(), identity.role);
            println!("{}", json!({ "id": identity.id, "email": identity.email, "role": identity.role, "expires_at": identity.expires_at }));
        }
        "logout" => {
            let resolver = SessionResolver::new(&cfg, open_store(&cfg)?, Arc::new(NoopNavigator));
            resolver.logout();
        }
        "-h" | "--help" | "help" => print_usage(&program),
        other => {
            eprintln!("unknown command '{}'", other);
            print_usage(&program);
            std::process::exit(2);
        }
    }
    Ok(())
}
