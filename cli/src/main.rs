use clap::{Parser, Subcommand};
use educa_progress::auth::{CryptError, UserClaims, generate_token};
use educa_progress::client::{ClientError, ProgressClient};
use educa_progress::error::AppError;
use educa_progress::model::entity::{Course, CourseCreate, Module, ModuleCreate, StudentProgress};
use educa_progress::model::{DatabaseError, DbConnection, ModelManager, Repository};
use educa_progress::progress::{CourseId, ModuleId, UserId};
use educa_progress::{Config, build_tracker};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(about = "CLI tool for courses and student progress", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Enroll a user and start their progress at the first module
    Enroll {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        course: i64,
    },

    /// Issue an API token for a user
    Token {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    /// Inspect stored progress
    Progress {
        #[command(subcommand)]
        action: ProgressCommands,
    },

    /// Talk to a running server
    Remote {
        /// Server root, e.g. http://127.0.0.1:5000
        #[arg(long)]
        url: String,
        #[arg(long, env = "EDUCA_TOKEN")]
        token: String,
        #[command(subcommand)]
        action: RemoteCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        overview: String,
    },
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        #[arg(long)]
        course: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Appended after the last module when omitted
        #[arg(long)]
        order_index: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// Cached progress next to the durable rows
    Show {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        course: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Progress in one course, or in every enrolled course
    Progress {
        #[arg(long)]
        course: Option<i64>,
    },
    /// Record the module the token's user is on
    Update {
        #[arg(long)]
        course: i64,
        #[arg(long)]
        module: i64,
        #[arg(long)]
        completed: Option<bool>,
    },
    Enroll {
        #[arg(long)]
        course: i64,
    },
    Resume {
        #[arg(long)]
        course: i64,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("token error: {0}")]
    Crypt(#[from] CryptError),
    #[error("request failed: {0}")]
    Client(#[from] ClientError),
    #[error("{0}")]
    NotFound(String),
}

type CliResult<T> = std::result::Result<T, CliError>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    match args.command {
        Commands::Token { user, role, hours } => {
            let config = Config::get_or_init(true).await;
            let claims = UserClaims::new(UserId::new(user), role, chrono::Duration::hours(hours));
            let token = generate_token(claims, config.app().jwt()).map_err(CryptError::from)?;
            println!("{token}");
        }
        Commands::Remote { url, token, action } => remote(&url, token, action).await?,
        Commands::Course { action } => course(action).await?,
        Commands::Module { action } => module(action).await?,
        Commands::Enroll { user, course } => enroll(user, course).await?,
        Commands::Progress { action } => progress(action).await?,
    }

    Ok(())
}

async fn connect() -> CliResult<ModelManager> {
    let config = Config::get_or_init(true).await;
    let uri = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| config.app().database_uri().to_string());
    let db_con = DbConnection::connect(&uri)?;
    db_con.migrate().await?;
    Ok(ModelManager::new(db_con))
}

async fn find_course(mm: &ModelManager, id: i64) -> CliResult<Course> {
    Course::find_by_id(mm, CourseId::new(id))
        .await?
        .ok_or_else(|| CliError::NotFound(format!("course {id} not found")))
}

async fn course(action: CourseCommands) -> CliResult<()> {
    let mm = connect().await?;

    match action {
        CourseCommands::Add { title, overview } => {
            let course = Course::create(&mm, CourseCreate { title, overview }).await?;
            println!("Course created: {:?}", course);
        }
        CourseCommands::List { limit, offset } => {
            let total = Course::count(&mm).await?;
            for course in Course::list(&mm, limit, offset).await? {
                println!("{:>6}  {}", course.id(), course.title());
            }
            println!("{total} course(s)");
        }
    }

    Ok(())
}

async fn module(action: ModuleCommands) -> CliResult<()> {
    let mm = connect().await?;

    match action {
        ModuleCommands::Add { course, title, description, order_index } => {
            let course = find_course(&mm, course).await?;
            let module = Module::create(
                &mm,
                ModuleCreate {
                    course_id: course.id(),
                    title,
                    description,
                    order_index,
                },
            )
            .await?;
            println!("Module created: {:?}", module);
        }
    }

    Ok(())
}

async fn enroll(user: i64, course: i64) -> CliResult<()> {
    let mm = connect().await?;
    let tracker = build_tracker(Config::get_or_init(true).await)?;

    let user = UserId::new(user);
    let course = find_course(&mm, course).await?;

    let newly_enrolled = course.enroll(&mm, user).await?;
    match Module::first_in_course(&mm, course.id()).await? {
        Some(first) if newly_enrolled => {
            let stored = tracker.set_last_module(user, course.id(), first.id()).await;
            println!(
                "Enrolled user {user} in {}, starting at module {} (stored: {stored})",
                course.title(),
                first.id()
            );
        }
        Some(_) => println!("User {user} was already enrolled in {}", course.title()),
        None => println!("Enrolled user {user} in {}, the course has no modules yet", course.title()),
    }

    Ok(())
}

async fn progress(action: ProgressCommands) -> CliResult<()> {
    let mm = connect().await?;
    let tracker = build_tracker(Config::get_or_init(true).await)?;

    match action {
        ProgressCommands::Show { user, course } => {
            let user = UserId::new(user);
            let course = find_course(&mm, course).await?;

            let total = Module::count_for_course(&mm, course.id()).await?;
            let snapshot = tracker.snapshot(user, course.id(), total).await;
            println!(
                "{} ({}%, {}/{total})",
                course.title(),
                snapshot.percentage,
                snapshot.completed_modules.len()
            );
            println!("  last module: {}", fmt_module(snapshot.last_module));
            println!("  completed:   {:?}", snapshot.completed_modules);

            let rows = StudentProgress::for_scope(&mm, user, course.id()).await?;
            println!("  durable rows: {}", rows.len());
            for row in rows {
                println!(
                    "    module {:>6}  completed={}  spent={}s  last_accessed={}",
                    row.module_id(),
                    row.completed(),
                    row.time_spent_seconds(),
                    row.last_accessed()
                );
            }
        }
    }

    Ok(())
}

async fn remote(url: &str, token: String, action: RemoteCommands) -> CliResult<()> {
    let client = ProgressClient::new(url, token)?;

    match action {
        RemoteCommands::Progress { course: Some(course) } => {
            let p = client.course_progress(CourseId::new(course)).await?;
            println!(
                "{} ({}%, {}/{})",
                p.course_title,
                p.progress_percentage,
                p.completed_modules.len(),
                p.total_modules
            );
            println!("  last module: {}", fmt_module(p.last_module));
            println!("  completed:   {:?}", p.completed_modules);
        }
        RemoteCommands::Progress { course: None } => {
            for p in client.all_progress().await?.courses {
                println!(
                    "{:>6}  {:<40} {:>3}%  last module: {}",
                    p.course_id,
                    p.course_title,
                    p.progress_percentage,
                    fmt_module(p.last_module)
                );
            }
        }
        RemoteCommands::Update { course, module, completed } => {
            let res = client
                .update_progress(CourseId::new(course), ModuleId::new(module), completed)
                .await?;
            println!("{:?} (mirrored: {})", res.status, res.mirrored);
        }
        RemoteCommands::Enroll { course } => {
            let res = client.enroll(CourseId::new(course)).await?;
            println!(
                "enrolled (new: {}), last module: {}",
                res.newly_enrolled,
                fmt_module(res.last_module)
            );
        }
        RemoteCommands::Resume { course } => {
            let res = client.resume(CourseId::new(course)).await?;
            println!("resume at module {} (stored: {})", fmt_module(res.module_id), res.resumed);
        }
    }

    Ok(())
}

fn fmt_module(module: Option<ModuleId>) -> String {
    module.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string())
}
