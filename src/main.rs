use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use editorial::net::api;
use editorial::net::transport::FileUpload;
use editorial::net::types::{
    BlogSettings, BlogUpdate, NewBlog, NewPost, PostQuery, PostUpdate, SignUpRequest, SortOrder, parse_problem_numbers,
};
use editorial::util::inactivity::IdleStatus;
use editorial::{ApiError, ClientConfig, SessionClient, SessionHolder};
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not signed in; run `editorial login` first")]
    NotSignedIn,
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "editorial", about = "EditorialHub blog API client")]
struct Cli {
    /// API base URL.
    #[arg(long, env = "EDITORIAL_API_URL")]
    api_url: Option<String>,

    /// Where the session token pair is kept between runs.
    #[arg(long, env = "EDITORIAL_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the session for later commands.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EDITORIAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Revoke and forget the stored session.
    Logout,
    /// Resolve the stored session and print the signed-in account.
    Whoami,
    /// Keep the session open, counting each stdin line as activity, until
    /// the idle timeout or an expiry signs it out.
    Watch,
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "EDITORIAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Blog(BlogCommand),
    Category(CategoryCommand),
    Post(PostCommand),
}

#[derive(Args, Debug)]
struct BlogCommand {
    #[command(subcommand)]
    command: BlogSubcommand,
}

#[derive(Subcommand, Debug)]
enum BlogSubcommand {
    List,
    Get {
        blog_id: i64,
    },
    /// The signed-in user's blog.
    Mine,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Update {
        blog_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        blog_id: i64,
    },
    /// Rename the signed-in user's blog or replace its cover image.
    Settings {
        #[arg(long)]
        name: Option<String>,
        /// Image file to upload as the new cover.
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct CategoryCommand {
    #[command(subcommand)]
    command: CategorySubcommand,
}

#[derive(Subcommand, Debug)]
enum CategorySubcommand {
    List {
        blog_id: i64,
    },
    Create {
        blog_id: i64,
        #[arg(long)]
        name: String,
    },
    Update {
        blog_id: i64,
        category_id: i64,
        #[arg(long)]
        name: String,
    },
    Delete {
        blog_id: i64,
        category_id: i64,
    },
}

#[derive(Args, Debug)]
struct PostCommand {
    #[command(subcommand)]
    command: PostSubcommand,
}

#[derive(Subcommand, Debug)]
enum PostSubcommand {
    List(PostListArgs),
    Get {
        blog_id: i64,
        post_id: i64,
    },
    Create(PostCreateArgs),
    Update(PostUpdateArgs),
    Delete {
        blog_id: i64,
        post_id: i64,
    },
    Like {
        blog_id: i64,
        post_id: i64,
    },
    Unlike {
        blog_id: i64,
        post_id: i64,
    },
}

#[derive(Args, Debug)]
struct PostCreateArgs {
    blog_id: i64,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    #[arg(long)]
    category_id: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    image_url: Option<String>,
    /// Hide the post from other users.
    #[arg(long)]
    secret: bool,
    #[arg(long)]
    protected: bool,
    #[arg(long)]
    no_comments: bool,
    /// Comma-separated, e.g. "1000,1920".
    #[arg(long)]
    problem_numbers: Option<String>,
}

#[derive(Args, Debug)]
struct PostUpdateArgs {
    blog_id: i64,
    post_id: i64,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    category_id: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    secret: Option<bool>,
    #[arg(long)]
    protected: Option<bool>,
    #[arg(long)]
    comments_enabled: Option<bool>,
    #[arg(long)]
    problem_numbers: Option<String>,
}

#[derive(Args, Debug)]
struct PostListArgs {
    blog_id: i64,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    per_page: u32,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    category_id: Option<String>,
    #[arg(long)]
    problem_number: Option<u32>,
    #[arg(long)]
    sort_by: Option<String>,
    #[arg(long)]
    order: Option<SortOrder>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url.as_deref() {
        config.api_url = editorial::config::normalize_api_url(api_url);
    }
    if let Some(token_file) = cli.token_file {
        config.token_file = token_file;
    }

    let client = Arc::new(SessionClient::from_config(&config)?);
    let holder = Arc::new(SessionHolder::new(Arc::clone(&client), config.startup_retry));

    match cli.command {
        Command::Login { email, password } => {
            let user = holder.login(&email, &password).await?;
            print_json(&user)
        }
        Command::Logout => {
            holder.logout().await;
            print_json(&json!({ "message": "Logged out" }))
        }
        Command::Whoami => {
            let state = holder.resolve().await;
            let user = state.user.ok_or(CliError::NotSignedIn)?;
            print_json(&user)
        }
        Command::Watch => watch(&holder, &config).await,
        Command::Signup { email, username, password } => {
            let user = api::sign_up(&client, &SignUpRequest { email, username, password }).await?;
            print_json(&user)
        }
        Command::Blog(blog) => run_blog(&client, blog).await,
        Command::Category(category) => run_category(&client, category).await,
        Command::Post(post) => run_post(&client, post).await,
    }
}

async fn watch(holder: &Arc<SessionHolder>, config: &ClientConfig) -> Result<(), CliError> {
    let state = holder.resolve().await;
    let user = state.user.ok_or(CliError::NotSignedIn)?;
    tracing::info!(username = %user.username, idle_secs = config.idle.logout_after.as_secs(), "watching session");

    let _follower = holder.follow_session();
    let monitor = holder.spawn_idle_logout(config.idle);
    let mut idle = monitor.subscribe();
    let mut states = holder.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(_) => monitor.touch(),
                None => stdin_open = false,
            },
            changed = idle.changed() => {
                if changed.is_err() {
                    break;
                }
                if *idle.borrow_and_update() == IdleStatus::Warning {
                    tracing::warn!(
                        remaining_secs = config.idle.logout_after.saturating_sub(config.idle.warn_after).as_secs(),
                        "idle; session will end soon without activity"
                    );
                }
            }
            changed = states.changed() => {
                if changed.is_err() || !states.borrow_and_update().is_authenticated() {
                    break;
                }
            }
        }
    }

    print_json(&json!({ "user": holder.snapshot().user }))
}

async fn run_blog(client: &SessionClient, blog: BlogCommand) -> Result<(), CliError> {
    match blog.command {
        BlogSubcommand::List => print_json(&api::list_blogs(client).await?),
        BlogSubcommand::Get { blog_id } => print_json(&api::fetch_blog(client, blog_id).await?),
        BlogSubcommand::Mine => print_json(&api::fetch_my_blog(client).await?),
        BlogSubcommand::Create { name, description } => {
            print_json(&api::create_blog(client, &NewBlog { name, description }).await?)
        }
        BlogSubcommand::Update { blog_id, name, description } => {
            let update = BlogUpdate { name, description };
            if update.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            print_json(&api::update_blog(client, blog_id, &update).await?)
        }
        BlogSubcommand::Delete { blog_id } => {
            api::delete_blog(client, blog_id).await?;
            print_json(&json!({ "deleted": blog_id }))
        }
        BlogSubcommand::Settings { name, image } => {
            let main_image_url = match image {
                Some(path) => Some(api::upload_image(client, read_upload(&path)?).await?),
                None => None,
            };
            let settings = BlogSettings { blog_name: name, main_image_url };
            if settings.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            print_json(&api::update_blog_settings(client, &settings).await?)
        }
    }
}

async fn run_category(client: &SessionClient, category: CategoryCommand) -> Result<(), CliError> {
    match category.command {
        CategorySubcommand::List { blog_id } => print_json(&api::list_categories(client, blog_id).await?),
        CategorySubcommand::Create { blog_id, name } => {
            print_json(&api::create_category(client, blog_id, &name).await?)
        }
        CategorySubcommand::Update { blog_id, category_id, name } => {
            print_json(&api::update_category(client, blog_id, category_id, &name).await?)
        }
        CategorySubcommand::Delete { blog_id, category_id } => {
            api::delete_category(client, blog_id, category_id).await?;
            print_json(&json!({ "deleted": category_id }))
        }
    }
}

async fn run_post(client: &SessionClient, post: PostCommand) -> Result<(), CliError> {
    match post.command {
        PostSubcommand::List(args) => {
            let query = PostQuery {
                search: args.search,
                category_id: args.category_id,
                problem_number: args.problem_number,
                sort_by: args.sort_by,
                order: args.order,
                ..PostQuery::page(args.page, args.per_page)
            };
            print_json(&api::list_posts(client, args.blog_id, &query).await?)
        }
        PostSubcommand::Get { blog_id, post_id } => print_json(&api::fetch_post(client, blog_id, post_id).await?),
        PostSubcommand::Create(args) => {
            let post = NewPost {
                description: args.description,
                main_image_url: args.image_url,
                secret: args.secret,
                protected: args.protected,
                comments_enabled: !args.no_comments,
                problem_numbers: args.problem_numbers.as_deref().map(parse_problem_numbers).unwrap_or_default(),
                ..NewPost::new(args.title, args.content, args.category_id)
            };
            print_json(&api::create_post(client, args.blog_id, &post).await?)
        }
        PostSubcommand::Update(args) => {
            let update = PostUpdate {
                title: args.title,
                content: args.content,
                description: args.description,
                category_id: args.category_id,
                main_image_url: args.image_url,
                secret: args.secret,
                protected: args.protected,
                comments_enabled: args.comments_enabled,
                problem_numbers: args.problem_numbers.as_deref().map(parse_problem_numbers),
            };
            if update.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            print_json(&api::update_post(client, args.blog_id, args.post_id, &update).await?)
        }
        PostSubcommand::Delete { blog_id, post_id } => {
            api::delete_post(client, blog_id, post_id).await?;
            print_json(&json!({ "deleted": post_id }))
        }
        PostSubcommand::Like { blog_id, post_id } => {
            api::like_post(client, blog_id, post_id).await?;
            print_json(&json!({ "liked": true }))
        }
        PostSubcommand::Unlike { blog_id, post_id } => {
            api::unlike_post(client, blog_id, post_id).await?;
            print_json(&json!({ "liked": false }))
        }
    }
}

fn read_upload(path: &Path) -> Result<FileUpload, CliError> {
    let bytes = std::fs::read(path)?;
    let file_name = path.file_name().map_or_else(|| "upload".to_owned(), |name| name.to_string_lossy().into_owned());
    Ok(FileUpload::new(file_name, bytes))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
