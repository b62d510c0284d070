use crate::cli::{Cli, Commands, ElementArgs};
use anyhow::{Context, Result};
use element_resolver::{
    HttpVisionChat, JsonFileStore, ResolverConfig, ScreenshotResult, Selector, SelectorMemory,
    VisionLocator,
};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = ResolverConfig::from_env();
    if let Some(path) = cli.memory {
        config.memory_path = path;
    }

    match cli.command {
        Commands::Stats => {
            let memory = open_memory(&config).await;
            print_json(&memory.get_stats())
        }
        Commands::Mappings { app } => {
            let memory = open_memory(&config).await;
            print_json(&memory.get_app_mappings(&app))
        }
        Commands::Show(ElementArgs { app, key }) => {
            let memory = open_memory(&config).await;
            let mapping = memory
                .find_element(&app, &key)
                .with_context(|| format!("No element '{key}' remembered for {app}"))?;
            print_json(&json!({
                "mapping": mapping,
                "ranked_selectors": memory.get_selectors(&app, &key),
            }))
        }
        Commands::Record {
            element,
            selector,
            confidence,
            at,
        } => {
            let memory = open_memory(&config).await;
            let selector = Selector::new(selector.kind, selector.value, confidence);
            memory
                .record_success(&element.app, &element.key, selector, at)
                .await;
            print_json(&memory.find_element(&element.app, &element.key))
        }
        Commands::Fail { element, selector } => {
            let memory = open_memory(&config).await;
            memory
                .record_failure(&element.app, &element.key, selector.kind, &selector.value)
                .await;
            print_json(&memory.find_element(&element.app, &element.key))
        }
        Commands::Describe { element, text } => {
            let memory = open_memory(&config).await;
            memory
                .set_visual_description(&element.app, &element.key, &text)
                .await;
            print_json(&memory.find_element(&element.app, &element.key))
        }
        Commands::Locate {
            screenshot,
            description,
            width,
            height,
        } => {
            ensure_vision(&config)?;
            let image = load_screenshot(&screenshot)?;
            let locator = vision_locator()?;
            let result = locator
                .find_element(
                    &image,
                    &description,
                    width.unwrap_or(image.width),
                    height.unwrap_or(image.height),
                )
                .await;
            print_json(&result)
        }
        Commands::DescribeScreen { screenshot } => {
            ensure_vision(&config)?;
            let image = load_screenshot(&screenshot)?;
            let text = vision_locator()?.describe_screen(&image).await;
            print_json(&json!({ "description": text }))
        }
    }
}

async fn open_memory(config: &ResolverConfig) -> SelectorMemory {
    info!("Using selector memory at {}", config.memory_path.display());
    SelectorMemory::open(Arc::new(JsonFileStore::new(&config.memory_path))).await
}

fn ensure_vision(config: &ResolverConfig) -> Result<()> {
    if !config.vision_enabled {
        anyhow::bail!("Vision is disabled via ELEMENT_RESOLVER_DISABLE_VISION");
    }
    Ok(())
}

fn vision_locator() -> Result<VisionLocator> {
    let chat = HttpVisionChat::from_env().context("Failed to create vision backend client")?;
    Ok(VisionLocator::new(Arc::new(chat)))
}

fn load_screenshot(path: &Path) -> Result<ScreenshotResult> {
    ScreenshotResult::open(path)
        .with_context(|| format!("Failed to read screenshot {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
