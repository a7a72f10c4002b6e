mod server;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use roomcraft_contracts::design::{RoomType, Style};
use roomcraft_contracts::records::{DesignStore, LocalDesignStore, ProfilePatch};
use roomcraft_contracts::recommendations::RecommendationRequest;
use roomcraft_contracts::session::{SessionContext, UserRole};
use roomcraft_engine::media::parse_data_url;
use roomcraft_engine::{
    load_room_photo, Actor, BackendClient, BackendConfig, DesignStudio, FunctionHandler,
    GatewayClient, GatewayConfig, LocalFunctions, SaveOutcome,
};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "roomcraft-rs", version, about = "AI room redesign functions and studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve both functions over HTTP.
    Serve(ServeArgs),
    /// Redesign a room photo and save the result.
    Generate(GenerateArgs),
    /// Change colours or details of an existing design image.
    Edit(EditArgs),
    /// Written design plan for a room, style and budget.
    Recommend(RecommendArgs),
    /// Featured designs, newest first.
    Gallery(StudioArgs),
    /// The caller's own designs.
    Designs(StudioArgs),
    /// Add a design to the gallery or remove it (admins only).
    Feature(FeatureArgs),
    /// Show or update the signed-in user's profile.
    Profile(ProfileArgs),
}

#[derive(Debug, Parser)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: SocketAddr,
}

/// Where designs live and who is asking. With `--email` the managed backend is
/// used for functions and rows; otherwise functions run in-process against
/// the gateway and rows go to `--store`.
#[derive(Debug, Clone, Args)]
struct StudioArgs {
    #[arg(long, default_value = "roomcraft-designs.json")]
    store: PathBuf,
    /// Owner id for offline use.
    #[arg(long)]
    user: Option<Uuid>,
    /// Act as an admin in offline mode.
    #[arg(long)]
    admin: bool,
    #[arg(long)]
    email: Option<String>,
    #[arg(long, env = "ROOMCRAFT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    /// Room photo (PNG, JPEG, WebP or GIF, at most 10 MB).
    #[arg(long)]
    photo: PathBuf,
    #[arg(long, value_parser = parse_style)]
    style: Style,
    #[arg(long = "room", value_parser = parse_room_type)]
    room_type: RoomType,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    studio: StudioArgs,
}

#[derive(Debug, Parser)]
struct EditArgs {
    /// Image file, data URL or http(s) URL to edit.
    #[arg(long)]
    image: String,
    #[arg(long)]
    colors: Option<String>,
    #[arg(long)]
    instructions: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    studio: StudioArgs,
}

#[derive(Debug, Parser)]
struct RecommendArgs {
    #[arg(long = "room")]
    room_type: String,
    #[arg(long)]
    style: String,
    #[arg(long)]
    budget: String,
    #[arg(long)]
    preferences: Option<String>,
    /// gemini, gemini-pro, gpt or gpt-pro.
    #[arg(long)]
    model: Option<String>,
    #[command(flatten)]
    studio: StudioArgs,
}

#[derive(Debug, Parser)]
struct ProfileArgs {
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    avatar_url: Option<String>,
    #[command(flatten)]
    studio: StudioArgs,
}

#[derive(Debug, Parser)]
struct FeatureArgs {
    #[arg(long)]
    id: Uuid,
    /// Remove the design from the gallery instead.
    #[arg(long)]
    off: bool,
    #[command(flatten)]
    studio: StudioArgs,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("roomcraft-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_serve(args),
        Command::Generate(args) => run_generate(args),
        Command::Edit(args) => run_edit(args),
        Command::Recommend(args) => run_recommend(args),
        Command::Gallery(args) => {
            let workspace = Workspace::open(&args)?;
            print_json(&serde_json::to_value(workspace.studio.gallery()?)?)?;
            Ok(0)
        }
        Command::Designs(args) => {
            let workspace = Workspace::open(&args)?;
            print_json(&serde_json::to_value(
                workspace.studio.my_designs(workspace.actor())?,
            )?)?;
            Ok(0)
        }
        Command::Profile(args) => run_profile(args),
        Command::Feature(args) => {
            let workspace = Workspace::open(&args.studio)?;
            let design = workspace
                .studio
                .set_featured(workspace.actor(), args.id, !args.off)?;
            println!(
                "{} {}",
                design.id,
                if design.is_featured { "featured" } else { "unfeatured" }
            );
            Ok(0)
        }
    }
}

fn run_serve(args: ServeArgs) -> Result<i32> {
    let config = GatewayConfig::from_env();
    if config.api_key.is_none() {
        warn!("LOVABLE_API_KEY is not set; generation requests will fail with 500");
    }
    if !config.fallback.is_configured() {
        info!("OPENAI_API_KEY is not set; 402 responses will not fall back");
    }
    // Built outside the runtime; the blocking HTTP client must also be
    // dropped outside it, hence the clone kept here.
    let handler = Arc::new(FunctionHandler::new(GatewayClient::from_config(config)?));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(server::serve(args.bind, Arc::clone(&handler)))?;
    drop(runtime);
    drop(handler);
    Ok(0)
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let workspace = Workspace::open(&args.studio)?;
    let photo = load_room_photo(&args.photo)?;
    info!(mime = photo.mime, bytes = photo.byte_len, "room photo loaded");
    let generated = workspace.studio.generate(
        workspace.actor(),
        &photo.data_url,
        args.style,
        args.room_type,
        args.description.as_deref(),
    )?;
    emit_image(&generated.image, args.out.as_deref())?;
    match generated.saved {
        SaveOutcome::Saved(design) => println!("saved design {}", design.id),
        SaveOutcome::Skipped => println!("design not saved (no owner)"),
        SaveOutcome::Failed(reason) => {
            println!("design generated but not saved: {reason}");
            return Ok(2);
        }
    }
    Ok(0)
}

fn run_edit(args: EditArgs) -> Result<i32> {
    let workspace = Workspace::open(&args.studio)?;
    let image = resolve_image_argument(&args.image)?;
    let edited = workspace.studio.edit(
        workspace.actor(),
        &image,
        args.colors.as_deref(),
        args.instructions.as_deref(),
    )?;
    emit_image(&edited, args.out.as_deref())?;
    Ok(0)
}

fn run_profile(args: ProfileArgs) -> Result<i32> {
    let workspace = Workspace::open(&args.studio)?;
    let (Some(backend), Some(context)) = (workspace.backend.as_ref(), workspace.context.as_ref()) else {
        bail!("profile needs a signed-in session (--email)");
    };
    let patch = ProfilePatch {
        full_name: args.full_name,
        avatar_url: args.avatar_url,
    };
    let profile = if patch == ProfilePatch::default() {
        backend.get_profile(&context.session)?
    } else {
        Some(backend.update_profile(&context.session, &patch)?)
    };
    match profile {
        Some(profile) => print_json(&serde_json::to_value(profile)?)?,
        None => println!("no profile for {}", context.user_id()),
    }
    if let Err(err) = backend.sign_out(&context.session) {
        warn!(error = %err, "sign out failed");
    }
    Ok(0)
}

fn run_recommend(args: RecommendArgs) -> Result<i32> {
    let workspace = Workspace::open(&args.studio)?;
    let advice = workspace.studio.recommend(
        workspace.actor(),
        &RecommendationRequest {
            room_type: args.room_type,
            style: args.style,
            budget: args.budget,
            preferences: args.preferences,
            model_preference: args.model,
        },
    )?;
    if let Some(model) = advice.model.as_deref() {
        info!(model, "recommendation generated");
    }
    println!("{}", advice.text);
    Ok(0)
}

/// A studio plus the identity it acts for.
struct Workspace {
    studio: DesignStudio,
    context: Option<SessionContext>,
    local_user: Option<Uuid>,
    local_role: Option<UserRole>,
    backend: Option<BackendClient>,
}

impl Workspace {
    fn open(args: &StudioArgs) -> Result<Self> {
        if let Some(email) = args.email.as_deref() {
            return Self::remote(args, email);
        }
        let gateway = GatewayClient::from_config(GatewayConfig::from_env())?;
        let invoker = Arc::new(LocalFunctions::new(Arc::new(FunctionHandler::new(gateway))));
        let store: Arc<dyn DesignStore> = Arc::new(LocalDesignStore::new(&args.store));
        Ok(Self {
            studio: DesignStudio::new(invoker, store),
            context: None,
            local_user: args.user,
            local_role: args.admin.then_some(UserRole::Admin),
            backend: None,
        })
    }

    fn remote(args: &StudioArgs, email: &str) -> Result<Self> {
        let Some(config) = BackendConfig::from_env() else {
            bail!("SUPABASE_URL and SUPABASE_ANON_KEY must be set to sign in");
        };
        let Some(password) = args.password.as_deref() else {
            bail!("--password (or ROOMCRAFT_PASSWORD) is required with --email");
        };
        let client = BackendClient::from_config(config, GatewayConfig::from_env().timeout)?;
        let session = client.sign_in(email, password)?;
        let context = client.resolve_session(session);
        info!(user_id = %context.user_id(), admin = context.is_admin(), "signed in");
        let store: Arc<dyn DesignStore> = Arc::new(client.designs(Some(&context.session)));
        Ok(Self {
            studio: DesignStudio::new(Arc::new(client.clone()), store),
            context: Some(context),
            local_user: None,
            local_role: None,
            backend: Some(client),
        })
    }

    fn actor(&self) -> Actor<'_> {
        match (&self.context, self.local_user) {
            (Some(context), _) => Actor::Member(context),
            (None, Some(user_id)) => Actor::Local {
                user_id,
                role: self.local_role,
            },
            (None, None) => Actor::Guest,
        }
    }
}

fn parse_style(raw: &str) -> Result<Style, String> {
    Style::parse(raw).ok_or_else(|| {
        let known = Style::ALL.map(Style::label).join(", ");
        format!("unknown style '{raw}' (expected one of: {known})")
    })
}

fn parse_room_type(raw: &str) -> Result<RoomType, String> {
    RoomType::parse(raw).ok_or_else(|| {
        let known = RoomType::ALL.map(RoomType::label).join(", ");
        format!("unknown room type '{raw}' (expected one of: {known})")
    })
}

/// Files are read and encoded; URLs and data URLs pass through.
fn resolve_image_argument(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with("data:") || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    Ok(load_room_photo(Path::new(trimmed))?.data_url)
}

/// Writes a data URL image to `out`, or prints the image reference.
fn emit_image(image: &str, out: Option<&Path>) -> Result<()> {
    let Some(out) = out else {
        println!("{image}");
        return Ok(());
    };
    if !image.starts_with("data:") {
        println!("{image}");
        warn!(path = %out.display(), "image is a remote URL; nothing written");
        return Ok(());
    }
    let decoded = parse_data_url(image)?;
    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(out, &decoded.bytes).with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote {} ({})", out.display(), decoded.mime);
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use roomcraft_engine::media::encode_data_url;

    use super::*;

    #[test]
    fn catalog_arguments_parse_with_helpful_errors() {
        assert_eq!(parse_style("industrial"), Ok(Style::Industrial));
        assert_eq!(parse_room_type("dining room"), Ok(RoomType::DiningRoom));
        let err = parse_style("Baroque").unwrap_err();
        assert!(err.contains("Scandinavian"));
    }

    #[test]
    fn image_arguments_pass_urls_through_and_encode_files() -> Result<()> {
        assert_eq!(
            resolve_image_argument(" https://img.test/a.png ")?,
            "https://img.test/a.png"
        );
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("room.png");
        fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0])?;
        let encoded = resolve_image_argument(path.to_string_lossy().as_ref())?;
        assert!(encoded.starts_with("data:image/png;base64,"));
        Ok(())
    }

    #[test]
    fn emit_image_writes_decoded_bytes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("nested").join("design.png");
        emit_image(&encode_data_url("image/png", b"pixels"), Some(&out))?;
        assert_eq!(fs::read(&out)?, b"pixels");
        Ok(())
    }

    #[test]
    fn profile_requires_a_signed_in_session() {
        let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let err = run_profile(ProfileArgs {
            full_name: None,
            avatar_url: None,
            studio: StudioArgs {
                store: dir.path().join("designs.json"),
                user: None,
                admin: false,
                email: None,
                password: None,
            },
        })
        .unwrap_err();
        assert!(err.to_string().contains("--email"));
    }

    #[test]
    fn offline_workspace_acts_for_the_given_user() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let user = Uuid::new_v4();
        let workspace = Workspace::open(&StudioArgs {
            store: dir.path().join("designs.json"),
            user: Some(user),
            admin: true,
            email: None,
            password: None,
        })?;
        assert_eq!(workspace.actor().user_id(), Some(user));
        assert!(workspace.actor().is_admin());
        assert!(workspace.studio.gallery()?.is_empty());
        Ok(())
    }
}
