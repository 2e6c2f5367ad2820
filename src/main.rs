mod assignment;
mod energy;
mod logging;
mod mission;
mod models;
mod network;
mod planner;
mod scenario;
mod sensor_data;
mod simulation;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Arg, ArgMatches, Command};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use logging::{LogConfig, LogOutput};
use network::SystemStatus;
use scenario::ScenarioConfig;
use simulation::SimulationEngine;

fn main() {
    let matches = Command::new("wrsnsim")
        .version("0.1.0")
        .about("UAV無線充電センサーネットワークシミュレーター")
        .long_about(
            "UAVが担当センサーを巡回して無線充電とデータ収集を行う\n\
             サイクル駆動型シミュレーションで、ネットワークの稼働可能期間を評価します。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help(
                    "実行するシナリオファイル(.yaml)のパスを指定します。\n\
                     指定しない場合、既定値のシナリオで実行されます。",
                ),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("FILE")
                .help("センサーデータファイルのパス（シナリオの指定を上書き）"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオ情報・割り当て・ホバリング時間を表示して終了")
                .conflicts_with("generate"),
        )
        .arg(
            Arg::new("generate")
                .short('g')
                .long("generate")
                .action(clap::ArgAction::SetTrue)
                .help("センサーデータを生成して終了"),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u32))
                .requires("generate")
                .help("生成するセンサーの個数（既定: シナリオの sensor.count）"),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_name("FILE")
                .help("最終状態をYAMLで書き出す"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let _log_guard = match init_logging(&matches, verbose_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    println!("UAV無線充電センサーネットワークシミュレーター - wrsnsim v0.1.0");
    println!();

    if let Err(e) = run(&matches, verbose_level) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(
    matches: &ArgMatches,
    verbose_level: u8,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    let output = match matches.get_one::<String>("log-output") {
        Some(value) => LogOutput::from_str(value)?,
        None => LogOutput::Console,
    };
    let level = match matches.get_one::<String>("log-level") {
        Some(value) => logging::parse_log_level(value),
        None => logging::level_for_verbosity(verbose_level),
    };

    logging::init_logging(LogConfig {
        level,
        output,
        ..LogConfig::default()
    })
}

fn run(matches: &ArgMatches, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            info!("シナリオファイル読み込み完了: {}", path);
            scenario
        }
        None => {
            info!("シナリオ未指定のため既定値を使用します");
            ScenarioConfig::default()
        }
    };
    if let Some(data) = matches.get_one::<String>("data") {
        scenario.sensor.data_file = PathBuf::from(data);
    }

    if matches.get_flag("generate") {
        let count = matches.get_one::<u32>("count").copied().unwrap_or(scenario.sensor.count);
        return generate_sensor_file(&scenario, count);
    }

    if matches.get_flag("info") {
        return show_info(scenario);
    }

    let status = execute_scenario(scenario, verbose_level)?;
    print_status(&status);

    if let Some(report) = matches.get_one::<String>("report") {
        write_report(Path::new(report), &status)?;
        println!("レポートを書き出しました: {}", report);
    }

    Ok(())
}

/// センサーデータを生成してファイルへ保存
fn generate_sensor_file(scenario: &ScenarioConfig, count: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.sim.seed);
    let records = sensor_data::generate_sensors(count, scenario.area.length_m, scenario.area.width_m, &mut rng)?;
    sensor_data::write_sensor_file(&scenario.sensor.data_file, &records)?;

    println!(
        "{}個のセンサーデータを生成しました: {}",
        records.len(),
        scenario.sensor.data_file.display()
    );
    Ok(())
}

fn load_engine(scenario: ScenarioConfig, verbose_level: u8) -> Result<SimulationEngine, Box<dyn std::error::Error>> {
    let sensors = sensor_data::load_sensors(&scenario.sensor.data_file, scenario.sensor.battery_capacity_j);
    let mut engine = SimulationEngine::new(scenario, sensors, verbose_level)?;
    engine.initialize()?;
    Ok(engine)
}

/// シナリオ情報と割り当て結果、UAVごとのホバリング時間を表示
fn show_info(scenario: ScenarioConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine(scenario, 0)?;
    let scenario = &engine.scenario_config;
    let state = &engine.state;

    scenario.print_summary();
    println!();

    println!("=== ネットワーク ===");
    println!("基地局: {}", state.base_station);
    println!("センサー: {}個", state.sensors.len());
    println!("UAV: {}機", state.uavs.len());
    println!();

    println!("=== センサー割り当て ===");
    for uav in &state.uavs {
        println!("UAV{}: {:?}", uav.id, state.assignment.sensors_of(uav.id));
    }
    println!();

    let capacity = energy::link_capacity(scenario.sensor.hover_distance_m, &scenario.channel)?;
    println!("=== UAV性能 ===");
    println!(
        "充電リンク容量: {:.2} Mbit/s (距離 {:.1}m)",
        capacity / 1e6,
        scenario.sensor.hover_distance_m
    );
    for uav in &state.uavs {
        let hover_time = state.total_hover_time(&engine.simulator, uav.id)?;
        println!(
            "UAV{}: P_mov {:.2}W, P_hov {:.2}W, 最大飛行距離 {:.0}m, 最大充電半径 {:.0}m, 総ホバリング時間 {:.2}秒",
            uav.id,
            uav.p_mov,
            uav.p_hov,
            uav.max_flight_distance(),
            uav.max_service_radius(scenario.sensor.battery_capacity_j),
            hover_time
        );
    }
    println!();

    println!("=== センサー別ホバリング時間 ===");
    for sensor in state.sensors.values() {
        match state.assignment.owner_of(sensor.id) {
            Some(uav_id) => {
                let hover_time = state.hover_time(&engine.simulator, uav_id, sensor.id)?;
                println!(
                    "{}{} {}: UAV{} ホバリング {:.2}秒",
                    sensor.kind, sensor.id, sensor.position, uav_id, hover_time
                );
            }
            None => println!("{}{} {}: 未割り当て", sensor.kind, sensor.id, sensor.position),
        }
    }

    Ok(())
}

/// シミュレーションの実行
fn execute_scenario(scenario: ScenarioConfig, verbose_level: u8) -> Result<SystemStatus, Box<dyn std::error::Error>> {
    let mut engine = load_engine(scenario, verbose_level)?;
    if verbose_level > 0 {
        engine.scenario_config.print_summary();
        println!();
    }

    Ok(engine.run())
}

fn print_status(status: &SystemStatus) {
    println!("=== 最終状態 ===");
    println!("完了サイクル数: {}", status.cycle_num);
    println!("シミュレーション時間: {:.1}秒", status.system_time);
    println!("稼働センサー: {}/{}", status.active_sensors, status.total_sensors);
    println!("稼働UAV: {}/{}", status.active_uavs, status.total_uavs);
    println!("未回収データ: {}件", status.collected_data_count);
    match &status.termination_reason {
        Some(reason) => println!("終了理由: {}", reason),
        None => println!("終了理由: -"),
    }
}

fn write_report(path: &Path, status: &SystemStatus) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(status)?)?;
    Ok(())
}
