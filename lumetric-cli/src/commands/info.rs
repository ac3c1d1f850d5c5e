//! The `info` command: print video stream properties.

use console::style;
use lumetric_core::{get_video_properties, resolve_input};

use crate::cli::InfoArgs;
use crate::commands::CliResult;

pub fn run(args: InfoArgs) -> CliResult {
    let videos = resolve_input(&args.input_path)?;
    for video in &videos {
        let props = get_video_properties(video)?;
        println!("{}", style(video.display()).bold());
        println!(
            "  codec:      {}",
            props.codec_name.as_deref().unwrap_or("unknown")
        );
        println!("  resolution: {}x{}", props.width, props.height);
        println!("  frame rate: {:.3} fps", props.fps);
        println!("  frames:     {}", props.frame_count);
        println!("  duration:   {:.2}s", props.duration_secs);
    }
    Ok(())
}
