//! The `analyze` command: run brightness analysis and export CSV/plots.

use std::fs;
use std::sync::Arc;

use console::style;
use lumetric_core::{
    csv_file_name, plot_file_name, resolve_input, video_name_for_export, write_region_csv,
    write_region_plot, AnalysisOrchestrator, AnalysisResult, Event, EventDispatcher,
    FfmpegFrameSource, FrameCache, FrameRange, FrameSource, LogEventHandler, MaskMode, RegionRole,
};

use crate::cli::AnalyzeArgs;
use crate::commands::{build_regions, load_config, CliResult};
use crate::progress::ProgressReporter;

pub fn run(args: AnalyzeArgs) -> CliResult {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = &args.name {
        config.analysis_name = name.clone();
    }
    let regions = build_regions(
        &args.regions,
        args.background.as_deref(),
        args.regions_file.as_deref(),
    )?;
    let mask_mode = if args.fixed_mask {
        MaskMode::Fixed
    } else {
        MaskMode::Ephemeral
    };

    let videos = resolve_input(&args.input_path)?;
    fs::create_dir_all(&args.output_dir)?;

    let mut events = EventDispatcher::new();
    events.add_handler(Arc::new(LogEventHandler));
    events.add_handler(Arc::new(ProgressReporter::new()));

    for video in &videos {
        println!("{} {}", style("Processing:").bold(), video.display());

        let source = Arc::new(FfmpegFrameSource::open(video)?);
        let cache = Arc::new(FrameCache::new(
            source.clone(),
            config.cache.capacity,
            config.cache.effective_workers(),
        )?);
        let last_frame = source.frame_count().saturating_sub(1);
        let range = FrameRange::new(args.start, args.end.unwrap_or(last_frame));

        let mut orchestrator =
            AnalysisOrchestrator::new(source, cache, events.clone());
        let result = orchestrator.run(range, &regions, &config, mask_mode)?;

        export(&result, &config.analysis_name, video, &args, config.plot_scale, &events)?;
    }

    Ok(())
}

fn export(
    result: &AnalysisResult,
    analysis_name: &str,
    video: &std::path::Path,
    args: &AnalyzeArgs,
    plot_scale: u32,
    events: &EventDispatcher,
) -> CliResult {
    let video_name = video_name_for_export(video);
    for region in &result.regions {
        if region.role != RegionRole::Measurement {
            continue;
        }
        let csv_path = args.output_dir.join(csv_file_name(
            analysis_name,
            &video_name,
            region.index,
            result.range,
        ));
        write_region_csv(result, region.index, &csv_path)?;
        events.emit(Event::FileWritten {
            path: csv_path.clone(),
        });

        if !args.no_plot {
            let plot_path = args.output_dir.join(plot_file_name(
                analysis_name,
                &video_name,
                region.index,
                result.range,
            ));
            write_region_plot(result, region.index, plot_scale, &plot_path)?;
            events.emit(Event::FileWritten { path: plot_path });
        }
    }
    Ok(())
}
