mod config;
mod error;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use chrono::Local;
use clap::{ArgGroup, Parser};
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;

use hull_exporter::{JsonDirPublisher, VisualizationPublisher};
use pcd_core::{
    geometry::{vector::Vector3, Pose, Quaternion},
    pointcloud::point::LabeledCloud,
};
use pcd_parser::{dataset::TestCase, parsers::parser_for, ParseError};
use plane_seg::{
    command::CommandSegmenter,
    replay::ReplaySegmenter,
    worker::{Event, SegmentationWorker},
    Orchestrator, Segmenter,
};

use crate::{config::PipelineConfig, error::AppError};

#[derive(Parser, Debug)]
#[command(
    name = "Plane Seg",
    about = "Runs plane segmentation on point clouds and publishes the hulls for visualization",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
#[command(group(ArgGroup::new("engine_source").required(true).args(["blocks", "engine"])))]
struct Cli {
    /// Point cloud files (.pcd, .ply); glob patterns are expanded. Each file is one cycle.
    #[arg(value_name = "FILE")]
    input: Vec<String>,

    /// Recorded dataset to run (0-5), resolved against --data-dir.
    #[arg(short, long)]
    test_case: Option<u8>,

    #[arg(long, value_name = "DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Directory receiving one JSON file per published message.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Replay a recorded segmentation result instead of running an engine.
    #[arg(long, value_name = "FILE")]
    blocks: Option<PathBuf>,

    /// External engine program, fed the request as JSON on stdin.
    #[arg(long, value_name = "PROGRAM")]
    engine: Option<String>,

    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Sensor origin as x,y,z. Overrides the robot pose and the test case.
    #[arg(long, value_parser = parse_vector3, allow_hyphen_values = true, requires = "look_dir")]
    origin: Option<Vector3>,

    /// Sensor look direction as x,y,z.
    #[arg(long, value_parser = parse_vector3, allow_hyphen_values = true, requires = "origin")]
    look_dir: Option<Vector3>,

    /// Robot pose as x,y,z,qw,qx,qy,qz, applied before the first cloud.
    #[arg(long, value_parser = parse_pose, allow_hyphen_values = true)]
    pose: Option<Pose>,

    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the per-block report to FILE, or to stdout with "-".
    /// One JSON object per cycle, one cycle per line.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Maximum plane segmenter angle in degrees.
    #[arg(long)]
    max_angle: Option<f64>,

    #[arg(long)]
    remove_ground: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn parse_values<const N: usize>(value: &str) -> Result<[f64; N], String> {
    let values = value
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;
    let count = values.len();
    values
        .try_into()
        .map_err(|_| format!("expected {} comma-separated numbers, got {}", N, count))
}

fn parse_vector3(value: &str) -> Result<Vector3, String> {
    let v = parse_values::<3>(value)?;
    if v.iter().all(|c| c.is_finite()) {
        Ok(v)
    } else {
        Err("values must be finite".to_string())
    }
}

fn parse_pose(value: &str) -> Result<Pose, String> {
    let [x, y, z, qw, qx, qy, qz] = parse_values::<7>(value)?;
    Pose::new([x, y, z], Quaternion::new(qw, qx, qy, qz))
        .ok_or_else(|| "pose must be finite with a non-zero quaternion".to_string())
}

fn expand_globs(input_patterns: Vec<String>) -> Result<Vec<PathBuf>, AppError> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let entries = glob(&pattern).map_err(|source| AppError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
            for entry in entries {
                match entry {
                    Ok(path) => paths.push(path),
                    Err(e) => log::warn!("skipping unreadable glob entry: {}", e),
                }
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

fn build_segmenter(args: &Cli) -> Result<Box<dyn Segmenter>, AppError> {
    match (&args.blocks, &args.engine) {
        (Some(path), _) => Ok(Box::new(ReplaySegmenter::from_path(path)?)),
        (None, Some(program)) => {
            log::info!("engine command: {} {:?}", program, args.engine_args);
            Ok(Box::new(CommandSegmenter::new(
                program.clone(),
                args.engine_args.clone(),
            )))
        }
        (None, None) => Err(AppError::NoEngine),
    }
}

fn build_sink(args: &Cli, config: &PipelineConfig) -> Result<VisualizationPublisher, AppError> {
    let mut sink = VisualizationPublisher::new(
        config.palette.clone(),
        config.frame_id.clone(),
        config.stamp,
    );
    if let Some(output) = &args.output {
        log::info!("output folder: {:?}", output);
        sink = sink.with_publisher(Box::new(JsonDirPublisher::new(output)));
    }
    match &args.report {
        Some(path) if path.as_os_str() == "-" => {
            sink = sink.with_report(Box::new(std::io::stdout()));
        }
        Some(path) => {
            let file = File::create(path).map_err(|source| AppError::Report {
                path: path.clone(),
                source,
            })?;
            sink = sink.with_report(Box::new(BufWriter::new(file)));
        }
        None => {}
    }
    Ok(sink)
}

/// Sensor placement for a cloud: the command line wins, then the test case,
/// otherwise the robot pose is used.
fn cloud_event(cloud: LabeledCloud, sensor: Option<(Vector3, Vector3)>) -> Event {
    let cloud = Arc::new(cloud);
    match sensor {
        Some((origin, look_direction)) => Event::CloudWithSensor {
            cloud,
            origin,
            look_direction,
        },
        None => Event::Cloud(cloud),
    }
}

fn run(args: Cli) -> Result<(), AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(max_angle) = args.max_angle {
        config.segmentation.max_angle_of_plane_segmenter = max_angle;
    }
    if args.remove_ground {
        config.segmentation.remove_ground = true;
    }
    log::info!("segmentation parameters: {:?}", config.segmentation);

    let start = std::time::Instant::now();
    let segmenter = build_segmenter(&args)?;
    let sink = build_sink(&args, &config)?;
    let orchestrator = Orchestrator::new(segmenter, config.segmentation.clone());
    let worker =
        SegmentationWorker::spawn(orchestrator, Box::new(sink)).map_err(AppError::Worker)?;

    if let Some(pose) = args.pose {
        worker
            .submit(Event::Pose(pose))
            .map_err(|_| AppError::WorkerStopped)?;
    }
    let cli_sensor = args.origin.zip(args.look_dir);

    if let Some(id) = args.test_case {
        let case = TestCase::from_id(id)?;
        log::info!("test case {}: {}", case.id, case.description);
        match case.load(&args.data_dir) {
            Ok(cloud) => {
                let sensor = cli_sensor.or(Some((case.origin, case.look_direction)));
                worker
                    .submit(cloud_event(cloud, sensor))
                    .map_err(|_| AppError::WorkerStopped)?;
            }
            Err(e) => log::error!("failed to load test case {}: {}", id, e),
        }
    }

    let input_files = expand_globs(args.input)?;
    log::info!("input files: {:?}", input_files);
    for path in input_files {
        let cloud = match parser_for(vec![path.clone()]).and_then(|parser| parser.parse()) {
            Ok(cloud) => cloud,
            Err(e @ ParseError::UnsupportedFileFormat(_)) => {
                log::warn!("skipping {:?}: {}", path, e);
                continue;
            }
            Err(e) => {
                log::error!("failed to parse {:?}: {}", path, e);
                continue;
            }
        };
        worker
            .submit(cloud_event(cloud, cli_sensor))
            .map_err(|_| AppError::WorkerStopped)?;
    }

    let orchestrator = worker.shutdown().map_err(|_| AppError::WorkerStopped)?;
    log::info!(
        "finished {} cycles in {:?}",
        orchestrator.cycle_count(),
        start.elapsed()
    );
    Ok(())
}

fn main() {
    let args = Cli::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arguments() {
        assert_eq!(
            parse_vector3("-0.028775, -0.005776,0.987898").unwrap(),
            [-0.028775, -0.005776, 0.987898]
        );
        assert!(parse_vector3("1,2").is_err());
        assert!(parse_vector3("1,2,x").is_err());
        assert!(parse_vector3("1,2,inf").is_err());
    }

    #[test]
    fn pose_argument_is_normalized() {
        let pose = parse_pose("1,2,3,2,0,0,0").unwrap();
        assert_eq!(pose.translation, [1.0, 2.0, 3.0]);
        assert_eq!(pose.rotation, Quaternion::identity());
        assert!(parse_pose("0,0,0,0,0,0,0").is_err());
    }

    #[test]
    fn cli_requires_an_engine() {
        assert!(Cli::try_parse_from(["planeseg", "a.pcd"]).is_err());
        let args = Cli::try_parse_from([
            "planeseg",
            "a.pcd",
            "--blocks",
            "blocks.json",
            "--origin",
            "0,0,1",
            "--look-dir",
            "1,0,-0.5",
        ])
        .unwrap();
        assert_eq!(args.look_dir, Some([1.0, 0.0, -0.5]));
    }

    #[test]
    fn origin_needs_look_direction() {
        let args = ["planeseg", "--blocks", "b.json", "--origin", "0,0,1"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn replay_run_writes_messages_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = dir.path().join("blocks.json");
        std::fs::write(
            &blocks,
            r#"{"blocks": [{"size": [1, 1, 0], "pose": {"translation": [0, 0, 0], "rotation": {"w": 1, "x": 0, "y": 0, "z": 0}}, "hull": [[0, 0, 0], [1, 0, 0], [1, 1, 0]]}]}"#,
        )
        .unwrap();
        let ply = dir.path().join("scan.ply");
        std::fs::write(
            &ply,
            "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n1 0 0\n",
        )
        .unwrap();
        let output = dir.path().join("out");
        let report = dir.path().join("report.json");

        let args = Cli::try_parse_from([
            "planeseg".into(),
            ply.into_os_string(),
            dir.path().join("notes.txt").into_os_string(),
            "--blocks".into(),
            blocks.into_os_string(),
            "--output".into(),
            output.clone().into_os_string(),
            "--report".into(),
            report.clone().into_os_string(),
        ])
        .unwrap();
        run(args).unwrap();

        assert!(output.join("0/plane_seg/hull_cloud.json").exists());
        assert!(output.join("0/plane_seg/look_pose.json").exists());
        assert!(!output.join("1").exists());
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(report["0_1"]["classname"], "BoxAffordanceItem");
    }
}
