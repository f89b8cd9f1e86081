//! `overcue` CLI - Drive a simulated caption session from the terminal

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use overcue::{
    parse_json, parse_srt, CueIndex, Document, Marker, RawCue, Session, SessionConfig,
};

#[derive(Parser)]
#[command(name = "overcue")]
#[command(about = "Caption synchronization engine for multi-feed lecture players")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated multi-feed session and print the caption timeline
    Demo {
        /// Transcript file (.srt, or a JSON raw-cue array); built-in
        /// sample when omitted
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Session config TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of video feeds in the simulated player
        #[arg(short, long, default_value = "2")]
        feeds: usize,

        /// Simulated playback length in seconds
        #[arg(short, long, default_value = "6")]
        duration: u64,

        /// Simulate a host layout switch halfway through
        #[arg(long, default_value = "true")]
        layout_switch: bool,
    },

    /// Build a cue index from a transcript file and report on it
    Cues {
        /// Transcript file (.srt, or a JSON raw-cue array)
        file: PathBuf,

        /// Times (in ms) to look up, repeatable
        #[arg(short = 'a', long = "at")]
        at: Vec<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            transcript,
            config,
            feeds,
            duration,
            layout_switch,
        } => {
            cmd_demo(transcript.as_deref(), config.as_deref(), feeds, duration, layout_switch)
                .await?;
        }
        Commands::Cues { file, at } => {
            cmd_cues(&file, &at)?;
        }
    }

    Ok(())
}

/// Load raw cues from a file, picking the parser by extension.
fn load_transcript(path: &Path) -> Result<Vec<RawCue>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading transcript {}", path.display()))?;
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("srt")) {
        parse_srt(&text)
    } else {
        parse_json(&text)
    }
}

fn sample_transcript() -> Vec<RawCue> {
    let cue = |start, end, content: &str| RawCue {
        start_ms: Some(start),
        end_ms: Some(end),
        content: Some(content.to_string()),
    };
    vec![
        cue(0, 1400, "Welcome back, everyone."),
        cue(1500, 3200, "Today we pick up where lecture four left off."),
        cue(3300, 4800, "Keep an eye on the whiteboard feed."),
        cue(4900, 6500, "Questions go in the chat as usual."),
    ]
}

/// Build the simulated host page: one wrapper per feed (the first holds
/// the leading video and the spotlight) plus a toolbar.
fn demo_page(feeds: usize) -> Result<Document> {
    let mut html = String::new();
    for i in 0..feeds {
        if i == 0 {
            html.push_str(
                r#"<div data-test-component="VideoWrapper" data-spotlight="true" data-rect="0 0 960 540">
                       <video data-test="leader"></video>
                   </div>"#,
            );
        } else {
            html.push_str(
                r#"<div data-test-component="VideoWrapper" data-rect="0 0 480 270"></div>"#,
            );
        }
    }
    html.push_str(
        r#"<div data-role="toolbar"><button data-testid="transcript-button">Transcript</button></div>"#,
    );
    Document::from_html(&html)
}

async fn cmd_demo(
    transcript: Option<&Path>,
    config: Option<&Path>,
    feeds: usize,
    duration: u64,
    layout_switch: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SessionConfig::from_toml_str(&text)?
        }
        None => SessionConfig::default(),
    };
    let raw = match transcript {
        Some(path) => load_transcript(path)?,
        None => sample_transcript(),
    };

    let mut doc = demo_page(feeds)?;
    let mut session = Session::new(config);

    session.on_mutation(&mut doc);
    session.on_transcript(raw);

    println!("🎬 {} feeds, {} cues, {}s playback", feeds, session.cue_count(), duration);

    let leader_marker = Marker::new("data-test", "leader");
    let switch_at_ms = duration * 500; // halfway
    let mut switched = false;
    let mut last_shown: Option<String> = None;
    let mut sim_ms: u64 = 0;

    while sim_ms < duration * 1000 {
        if layout_switch && !switched && sim_ms >= switch_at_ms {
            host_layout_switch(&mut doc, feeds)?;
            switched = true;
            println!("   [{sim_ms:>6}ms] host switched layouts");
        }

        // Observer task: react to whatever the host did since last frame.
        session.on_mutation(&mut doc);

        if let Some(leader) = doc.query_first(&leader_marker) {
            #[allow(clippy::cast_precision_loss)]
            doc.set_media_time(leader, sim_ms as f64 / 1000.0);
        }

        // Frame task: reschedules itself only after finishing one pass.
        let delay = session.tick(&mut doc);

        let shown = session.displayed_text(&doc).map(ToString::to_string);
        if shown != last_shown {
            match &shown {
                Some(text) => println!("   [{sim_ms:>6}ms] \"{text}\""),
                None => println!("   [{sim_ms:>6}ms] (hidden)"),
            }
            last_shown = shown;
        }

        tokio::time::sleep(delay).await;
        sim_ms += u64::try_from(delay.as_millis()).unwrap_or(16).max(1);
    }

    let state = session.selection();
    println!(
        "✨ Done: {} feeds, active = {:?}, {} surface writes",
        session.overlay_count(),
        state.active,
        session.surface_writes()
    );
    session.dispose(&mut doc);
    Ok(())
}

/// Simulate the host framework replacing the whole player subtree, the
/// way layout switches render: old wrappers detach, fresh ones appear.
fn host_layout_switch(doc: &mut Document, feeds: usize) -> Result<()> {
    let wrapper_marker = Marker::new("data-test-component", "VideoWrapper");
    for node in doc.query_all(&wrapper_marker) {
        doc.detach(node);
    }
    for i in 0..feeds {
        let wrapper = doc.create_element("div");
        doc.set_attr(wrapper, "data-test-component", "VideoWrapper");
        doc.set_rect(wrapper, overcue::Rect::new(0.0, 0.0, 720.0, 405.0));
        if i == 0 {
            doc.set_attr(wrapper, "data-spotlight", "true");
            let video = doc.create_element("video");
            doc.set_attr(video, "data-test", "leader");
            doc.append_child(wrapper, video);
        }
        let root = doc.root();
        doc.append_child(root, wrapper);
    }
    Ok(())
}

fn cmd_cues(file: &Path, at: &[u64]) -> Result<()> {
    let raw = load_transcript(file)?;
    let received = raw.len();
    let index = CueIndex::build(raw);

    println!("📋 {}", file.display());
    println!("   Entries: {received} received, {} kept", index.len());
    if let (Some(first), Some(last)) = (index.cues().first(), index.cues().last()) {
        println!("   Span: {}ms - {}ms", first.start_ms, last.end_ms);
    }

    for &time in at {
        match index.lookup(time) {
            Some(cue) => println!("   {time}ms → \"{}\"", cue.content),
            None => println!("   {time}ms → (no cue)"),
        }
    }

    Ok(())
}
