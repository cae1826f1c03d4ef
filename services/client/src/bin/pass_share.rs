//! services/client/src/bin/pass_share.rs

use clap::{Parser, Subcommand};
use pass_share_client::{
    app::{AppState, AuthController, AuthError, SessionController},
    config::Config,
    error::ClientError,
};
use pass_share_core::domain::{LocalFile, Registration, SharedFile};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pass-share", version, about = "Share files with a passkey")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with a username or email address. Without a password the
    /// remembered credentials are used.
    Login {
        identifier: Option<String>,
        #[arg(long, env = "PASS_SHARE_PASSWORD")]
        password: Option<String>,
        /// Keep the credentials for the next time.
        #[arg(long)]
        remember: bool,
    },
    /// Create an account.
    Register {
        username: String,
        email: String,
        #[arg(long, env = "PASS_SHARE_PASSWORD")]
        password: String,
    },
    /// Forget the cached login.
    Logout,
    /// Show the cached login.
    Whoami,
    /// Open a new session and print its passkey.
    Create {
        /// Keep polling and print the file list as it changes.
        #[arg(long)]
        watch: bool,
    },
    /// Join an existing session.
    Join {
        passkey: String,
        #[arg(long)]
        watch: bool,
    },
    /// List the files of a session.
    Files { passkey: String },
    /// Upload a file into a session.
    Upload {
        passkey: String,
        path: PathBuf,
        /// Override the MIME type guessed from the extension.
        #[arg(long)]
        mime: Option<String>,
    },
    /// Download a shared file by id.
    Download { file_id: String, name: String },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // --- 2. Wire Adapters ---
    tokio::fs::create_dir_all(&config.data_dir).await?;
    let app_state = AppState::from_config(config)?;
    let auth = AuthController::new(&app_state);

    if !auth.has_onboarded().await? {
        info!("Welcome to pass-share. Log in or register to start sharing.");
        auth.complete_onboarding().await?;
    }

    // --- 3. Run the Command ---
    match cli.command {
        Command::Login {
            identifier,
            password,
            remember,
        } => {
            let credentials = auth.prefill_login(identifier, password).await?;
            auth.login(credentials, remember)
                .await
                .map_err(auth_failure)?;
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            auth.register(Registration {
                username,
                email,
                password,
            })
            .await
            .map_err(auth_failure)?;
        }
        Command::Logout => auth.logout().await?,
        Command::Whoami => match auth.current_user().await? {
            Some(user) => println!("{} ({})", user.username, user.id),
            None => println!("Not logged in"),
        },
        Command::Create { watch } => {
            let sessions = session_controller(&app_state, &auth).await?;
            let passkey = sessions.create_session().await?;
            println!("{}", passkey);
            print_files(&sessions.files().await);
            if watch {
                watch_files(&sessions).await?;
            }
        }
        Command::Join { passkey, watch } => {
            let sessions = session_controller(&app_state, &auth).await?;
            sessions.join_session(&passkey).await?;
            print_files(&sessions.files().await);
            if watch {
                watch_files(&sessions).await?;
            }
        }
        Command::Files { passkey } => {
            let sessions = session_controller(&app_state, &auth).await?;
            sessions.join_session(&passkey).await?;
            print_files(&sessions.files().await);
            sessions.leave().await;
        }
        Command::Upload {
            passkey,
            path,
            mime,
        } => {
            let sessions = session_controller(&app_state, &auth).await?;
            sessions.join_session(&passkey).await?;
            let mut file = LocalFile::new(path);
            file.mime_type = mime;
            sessions.upload(file).await?;
            print_files(&sessions.files().await);
            sessions.leave().await;
        }
        Command::Download { file_id, name } => {
            let sessions = session_controller(&app_state, &auth).await?;
            let path = sessions.download(&file_id, &name).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

async fn session_controller(
    app_state: &AppState,
    auth: &AuthController,
) -> Result<SessionController, ClientError> {
    let user = auth.current_user().await?;
    Ok(SessionController::new(app_state, user))
}

fn auth_failure(err: AuthError) -> ClientError {
    match err {
        AuthError::Port(e) => ClientError::Port(e),
        AuthError::Invalid(errors) => ClientError::Internal(
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        AuthError::Conflict(e) => ClientError::Internal(e.message),
    }
}

fn print_files(files: &[SharedFile]) {
    if files.is_empty() {
        println!("(no files yet)");
        return;
    }
    for file in files {
        println!(
            "{:<12} {:>10}  {:<16} {}",
            file.id, file.size, file.uploader_username, file.file_name
        );
    }
}

/// Prints the file list on every change until Ctrl-C, then leaves.
async fn watch_files(sessions: &SessionController) -> Result<(), ClientError> {
    let mut files: watch::Receiver<Arc<Vec<SharedFile>>> = sessions.subscribe_files();
    info!("Watching for new files. Press Ctrl-C to leave.");
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = files.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = files.borrow_and_update().clone();
                print_files(&current);
            }
        }
    }
    sessions.leave().await;
    Ok(())
}
