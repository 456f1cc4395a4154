//! Subcommand parsing and execution.

use chrono::Local;

use folio_core::models::NewContactMessage;
use folio_core::stores::ActionResult;
use folio_core::utils::{format_date, strip_html};
use folio_core::{ApiError, Config, Stores};

pub const USAGE: &str = "\
Usage: folio <command> [args]

Commands:
  login [username] [--remember]    Sign in (password is prompted)
  logout                           Forget the saved session
  whoami                           Show the signed-in user
  status                           Show session and backend settings
  posts                            List published posts
  post <id>                        Show one post
  portfolio                        List portfolio projects
  tags                             List tags
  messages                         List contact messages (admin)
  contact <name> <email> <message...>
                                   Send a message through the contact form
  health                           Check backend health
  check <endpoint...>              Time GET requests against endpoints

Environment:
  FOLIO_API_URL    Backend base URL (default http://localhost:8000/api/v1)
  FOLIO_LOG_DIR    Also write logs to a daily file in this directory
  RUST_LOG         Log filter (default warn)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login { username: Option<String>, remember: bool },
    Logout,
    Whoami,
    Status,
    Posts,
    Post(i64),
    Portfolio,
    Tags,
    Messages,
    Contact { name: String, email: String, message: String },
    Health,
    Check(Vec<String>),
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "help" | "--help" | "-h" => Command::Help,
            "login" => {
                let remember = rest.iter().any(|a| a == "--remember" || a == "-r");
                let username = rest.iter().find(|a| !a.starts_with('-')).cloned();
                Command::Login { username, remember }
            }
            "logout" => Command::Logout,
            "whoami" => Command::Whoami,
            "status" => Command::Status,
            "posts" => Command::Posts,
            "post" => {
                let id = rest.first().ok_or("post: missing <id>")?;
                let id = id
                    .parse::<i64>()
                    .map_err(|_| format!("post: invalid id '{}'", id))?;
                Command::Post(id)
            }
            "portfolio" => Command::Portfolio,
            "tags" => Command::Tags,
            "messages" => Command::Messages,
            "contact" => match rest {
                [name, email, message @ ..] if !message.is_empty() => Command::Contact {
                    name: name.clone(),
                    email: email.clone(),
                    message: message.join(" "),
                },
                _ => return Err("contact: expected <name> <email> <message...>".to_string()),
            },
            "health" => Command::Health,
            "check" => {
                if rest.is_empty() {
                    return Err("check: at least one endpoint is required".to_string());
                }
                Command::Check(rest.to_vec())
            }
            other => return Err(format!("Unknown command: {}", other)),
        };
        Ok(command)
    }
}

pub async fn run(command: Command, stores: &Stores, config: &mut Config) -> ActionResult<()> {
    match command {
        Command::Help => println!("{}", USAGE),
        Command::Login { username, remember } => login(stores, config, username, remember).await?,
        Command::Logout => {
            stores.auth.logout().await?;
            println!("Logged out.");
        }
        Command::Whoami => whoami(stores).await?,
        Command::Status => status(stores),
        Command::Posts => posts(stores).await?,
        Command::Post(id) => post(stores, id).await?,
        Command::Portfolio => portfolio(stores).await?,
        Command::Tags => tags(stores).await?,
        Command::Messages => messages(stores).await?,
        Command::Contact { name, email, message } => {
            let form = NewContactMessage {
                name,
                email,
                subject: None,
                message,
            };
            let sent = stores.contact.submit(&form).await?;
            println!("Message #{} sent. Thank you!", sent.id);
        }
        Command::Health => health(stores).await?,
        Command::Check(endpoints) => check(stores, &endpoints).await?,
    }
    Ok(())
}

async fn login(
    stores: &Stores,
    config: &mut Config,
    username: Option<String>,
    remember: bool,
) -> ActionResult<()> {
    let username = username
        .or_else(|| config.last_username.clone())
        .ok_or_else(|| ApiError::InvalidRequest("login: missing <username>".to_string()))?;
    let password = rpassword::prompt_password(format!("Password for {}: ", username))
        .map_err(|e| ApiError::InvalidRequest(format!("Cannot read password: {}", e)))?;

    let user = stores.auth.login(&username, &password, remember).await?;

    config.last_username = Some(username);
    config.save()?;

    let minutes = stores.api.tokens().remaining_minutes();
    println!(
        "Logged in as {} (session valid for {}h {}m)",
        user.display_name(),
        minutes / 60,
        minutes % 60
    );
    Ok(())
}

async fn whoami(stores: &Stores) -> ActionResult<()> {
    if !stores.auth.is_authenticated() {
        return Err(ApiError::Unauthorized);
    }
    let user = stores.auth.fetch_current_user().await?;
    println!("{} <{}>", user.display_name(), user.email.as_deref().unwrap_or("-"));
    if user.is_admin {
        println!("Role: admin");
    }
    Ok(())
}

fn status(stores: &Stores) {
    println!("Backend:  {}", stores.api.base_url());
    match stores.api.tokens().record() {
        Some(record) if stores.auth.is_authenticated() => {
            let expiry = record.expiry.with_timezone(&Local);
            println!("Session:  active ({} token)", record.token_type);
            println!("Expires:  {}", expiry.format("%Y-%m-%d %H:%M"));
            println!("Left:     {} min", stores.api.tokens().remaining_minutes());
            println!("Remember: {}", if record.remember_me { "yes" } else { "no" });
        }
        Some(_) => println!("Session:  expired"),
        None => println!("Session:  none"),
    }
}

async fn posts(stores: &Stores) -> ActionResult<()> {
    let posts = stores.blog.fetch_public_posts().await?;
    if posts.is_empty() {
        println!("No posts yet.");
    }
    for post in posts {
        let date = post.created_at.as_deref().map(format_date).unwrap_or_default();
        println!("#{:<4} {:<12} {}", post.id, date, post.title);
        println!("      {}", post.excerpt());
    }
    Ok(())
}

async fn post(stores: &Stores, id: i64) -> ActionResult<()> {
    let post = stores.blog.fetch_post(id).await?;
    println!("{}", post.title);
    if let Some(date) = post.created_at.as_deref() {
        println!("{}", format_date(date));
    }
    if !post.tags.is_empty() {
        println!("Tags: {}", post.tags.join(", "));
    }
    println!();
    println!("{}", strip_html(&post.content));
    Ok(())
}

async fn portfolio(stores: &Stores) -> ActionResult<()> {
    stores.portfolio.fetch_public().await?;
    for item in stores.portfolio.featured_first() {
        let marker = if item.featured { "*" } else { " " };
        println!("{} {}  [{}]", marker, item.title, item.technologies_display());
        if let Some(url) = item.demo_url.as_deref().or(item.github_url.as_deref()) {
            println!("    {}", url);
        }
    }
    Ok(())
}

async fn tags(stores: &Stores) -> ActionResult<()> {
    for tag in stores.tags.fetch_tags().await? {
        match tag.post_count {
            Some(count) => println!("{} ({})", tag.name, count),
            None => println!("{}", tag.name),
        }
    }
    Ok(())
}

async fn messages(stores: &Stores) -> ActionResult<()> {
    let messages = stores.contact.fetch_messages().await?;
    println!("{} messages, {} unread", messages.len(), stores.contact.unread_count());
    for message in messages {
        let marker = if message.is_read { " " } else { "N" };
        let date = message.created_at.as_deref().map(format_date).unwrap_or_default();
        println!("{} #{:<4} {:<12} {} <{}>", marker, message.id, date, message.name, message.email);
        if let Some(subject) = message.subject.as_deref() {
            println!("         {}", subject);
        }
    }
    Ok(())
}

async fn health(stores: &Stores) -> ActionResult<()> {
    let health = stores.system.check_health().await?;
    println!("Status:   {}", health.status);
    if let Some(version) = health.version.as_deref() {
        println!("Version:  {}", version);
    }
    if let Some(database) = health.database.as_deref() {
        println!("Database: {}", database);
    }
    Ok(())
}

async fn check(stores: &Stores, endpoints: &[String]) -> ActionResult<()> {
    let endpoints: Vec<&str> = endpoints.iter().map(String::as_str).collect();
    for result in stores.system.test_endpoints(&endpoints).await? {
        println!("{:>6} ms  {}", result.elapsed_ms, result.endpoint);
    }
    Ok(())
}
