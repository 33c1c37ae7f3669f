use futures::StreamExt;
use lumina::logger::{self, LoggerConfig};
use lumina::{GeminiClient, GeminiConfig, GenerationSettings, Voice};
use std::env;
use std::fs;

const USAGE: &str = "usage:
  lumina generate <prompt> [--style <style>] [--narrate <language>] [--voice <id>]
  lumina storyboard <script>
  lumina refine <prompt>
  lumina voices";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::from_env())?;
    if !dotenv_loaded {
        log::debug!("No .env file found, using process environment");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    if command == "voices" {
        for voice in Voice::catalogue() {
            println!("{:<8} {:?}  {}", voice.id, voice.gender, voice.description);
        }
        return Ok(());
    }

    let config = GeminiConfig::from_env();
    log::info!(
        "Using {} (poll every {:?})",
        config.base_url,
        config.poll_interval
    );
    let client = GeminiClient::new(config)?;
    if !client.has_credential() {
        log::warn!("No API key found; set API_KEY or add it to .env");
    }

    match command.as_str() {
        "generate" => generate(&client, &args[1..]).await?,
        "storyboard" => {
            let script = args[1..].join(" ");
            let scenes = client.plan_storyboard(&script).await;
            if scenes.is_empty() {
                log::warn!("No storyboard produced");
            }
            for (i, scene) in scenes.iter().enumerate() {
                println!("{}. {} [{}]\n   {}", i + 1, scene.title, scene.shot_type, scene.prompt);
            }
        }
        "refine" => {
            let prompt = args[1..].join(" ");
            println!("{}", client.refine_prompt(&prompt).await);
        }
        _ => eprintln!("{}", USAGE),
    }

    Ok(())
}

async fn generate(client: &GeminiClient, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut prompt = Vec::new();
    let mut settings = GenerationSettings::new("");
    let mut language = None;
    let mut voice = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--style" => settings = settings.with_style(iter.next().cloned().unwrap_or_default()),
            "--narrate" => language = iter.next().cloned(),
            "--voice" => voice = iter.next().cloned(),
            other => prompt.push(other.to_string()),
        }
    }
    settings.prompt = prompt.join(" ");
    if language.is_some() || voice.is_some() {
        settings = settings.with_narration(None, voice, language);
    }

    let mut job = client.spawn_video_job(settings);
    log::info!("[job {}] started", job.id);

    while let Some(event) = job.events.next().await {
        log::info!("[job {}] {}", job.id, event.status());
    }

    let output = match job.wait().await {
        Ok(output) => output,
        Err(e) => {
            log::error!("Video generation failed ({}): {}", e.kind(), e);
            return Err(e.into());
        }
    };

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let video_path = format!("lumina_{}.mp4", stamp);
    fs::write(&video_path, &output.artifact.bytes)?;
    log::info!("Saved {} ({} bytes)", video_path, output.artifact.len());

    if let Some(narration) = &output.narration {
        let audio_path = format!("lumina_{}.wav", stamp);
        fs::write(&audio_path, &narration.audio)?;
        log::info!("Saved narration {}: \"{}\"", audio_path, narration.script);
    }

    Ok(())
}
