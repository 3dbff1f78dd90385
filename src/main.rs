use anyhow::{bail, Context, Result};
use env_logger::Env;
use hatbot_core::{ChannelId, UserId};
use hatbot_cv::traits::ChannelPolicyStore;
use hatbot_cv::{
    cancel_pair, CancelToken, DefaultHat, DirAssetStore, DirChannelPolicy, HatResolver, Orchestrator,
    PipelineConfig,
};
use log::{error, info, warn};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod request;
mod sidecar;

use request::{admit, Attachment, Message, Reply};
use sidecar::SidecarDetector;

const USAGE: &str = "usage:
  hatbot run <channel> <user> <image>...
  hatbot sethat <user> <png>
  hatbot rmhat <user>
  hatbot toggle <channel>";

struct Workspace {
    config: PipelineConfig,
    store_dir: PathBuf,
}

impl Workspace {
    fn from_env() -> Result<Self> {
        let config = match env::var("HATBOT_CONFIG") {
            Ok(path) => PipelineConfig::load(&path)?,
            Err(_) => PipelineConfig::default(),
        };
        let store_dir = env::var("HATBOT_STORE_DIR").unwrap_or_else(|_| "hatbot-data".to_string());
        Ok(Self {
            config,
            store_dir: PathBuf::from(store_dir),
        })
    }

    fn hats(&self) -> Arc<DirAssetStore> {
        Arc::new(DirAssetStore::new(self.store_dir.join("hats")))
    }

    fn channels(&self) -> DirChannelPolicy {
        DirChannelPolicy::new(self.store_dir.join("channels"))
    }

    fn default_hat(&self) -> Result<DefaultHat> {
        DefaultHat::load(&self.config.default_hat_path)
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("hatbot=info,hatbot_cv=info"))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let ctx = Workspace::from_env()?;

    match args {
        [cmd, channel, user, images @ ..] if cmd == "run" && !images.is_empty() => {
            put_hats(&ctx, ChannelId::new(channel.as_str()), UserId::new(user.as_str()), images).await
        }
        [cmd, user, png] if cmd == "sethat" => {
            let bytes = tokio::fs::read(png)
                .await
                .with_context(|| format!("Failed to read hat: {png}"))?;
            let token = CancelToken::never();
            let resolver = HatResolver::new(ctx.hats(), ctx.default_hat()?, ctx.config.store_timeout());
            resolver.set_custom(&UserId::new(user.as_str()), bytes, &token).await?;
            println!("Custom hat set for {user}");
            Ok(())
        }
        [cmd, user] if cmd == "rmhat" => {
            let token = CancelToken::never();
            let resolver = HatResolver::new(ctx.hats(), ctx.default_hat()?, ctx.config.store_timeout());
            if resolver.remove_custom(&UserId::new(user.as_str()), &token).await? {
                println!("Custom hat removed for {user}");
            } else {
                println!("No custom hat stored for {user}");
            }
            Ok(())
        }
        [cmd, channel] if cmd == "toggle" => {
            let channel = ChannelId::new(channel.as_str());
            let enabled = ctx.channels().toggle(&channel).await?;
            println!(
                "Hats are now {} in channel {channel}",
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

async fn put_hats(ctx: &Workspace, channel: ChannelId, user: UserId, images: &[String]) -> Result<()> {
    let mut detector = SidecarDetector::new();
    let mut attachments = Vec::with_capacity(images.len());
    for path in images {
        let path = Path::new(path);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image: {}", path.display()))?;
        detector.insert_file(path, &bytes)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        attachments.push(Attachment { filename, bytes });
    }

    let message = Message {
        author: user,
        author_is_bot: false,
        channel: channel.clone(),
        attachments,
    };
    let Some(request) = admit(message, &ctx.channels(), &ctx.config).await? else {
        info!("Message ignored (channel {channel} disabled or no image attachments)");
        return Ok(());
    };

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(detector),
        ctx.hats(),
        ctx.default_hat()?,
        ctx.config.clone(),
    ));

    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            handle.cancel();
        }
    });

    let outcome = orchestrator
        .spawn(request, token)
        .await
        .context("Request task panicked")?;
    for (name, err) in outcome.failures() {
        warn!("{name}: {err}");
    }

    let Some(reply) = Reply::from_outcome(channel, outcome, orchestrator.config()) else {
        info!("No animals found, nothing to post");
        return Ok(());
    };

    let out_dir = ctx.store_dir.join("out");
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    for (i, file) in reply.files.iter().enumerate() {
        let path = out_dir.join(format!("{i}-{}", file.name));
        tokio::fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    println!("[#{}] {}", reply.channel, reply.content);
    Ok(())
}
