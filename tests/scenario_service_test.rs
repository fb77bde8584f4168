//! Tests for ScenarioService

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use landalloc::application::services::ScenarioService;
use landalloc::application::{AllocationReport, ApplicationError};
use landalloc::domain::{AllocationItem, Diagnostics, ModelContext, ScenarioDef};
use landalloc::infrastructure::traits::{MemoryFileSystem, RealFileSystem};
use landalloc::util::testing;

const EPS: f64 = 1e-9;

const USA: &str = r#"
[[regions]]
name = "usa"

[regions.root]
name = "land"
sigma = 1.0
land_allocation = [200.0, 200.0, 200.0]

[[regions.root.children]]
type = "leaf"
name = "corn"

[[regions.root.children]]
type = "unmanaged"
name = "pasture"
base_land_allocation = [100.0, 100.0, 100.0]
base_intrinsic_rate = [1.0, 1.0, 1.0]

[[regions.calibration]]
kind = "land"
product = "corn"
value = 100.0
period = 0

[[regions.calibration]]
kind = "yield"
product = "corn"
value = 7.5
period = 0

[[regions.calibration]]
kind = "ag_prod_change"
product = "corn"
value = 0.01
period = 1

[[regions.rates]]
product = "corn"
period = 0
rate = 4.0

[[regions.rates]]
product = "corn"
period = 1
rate = 1.0
"#;

const BRAZIL: &str = r#"
[[regions]]
name = "brazil"

[regions.root]
name = "land"
sigma = 2.0
land_allocation = [500.0, 0.0, 0.0]

[[regions.root.children]]
type = "leaf"
name = "soy"

[[regions.root.children]]
type = "leaf"
name = "sugar"

[[regions.rates]]
product = "soy"
period = 0
rate = 9.0

[[regions.rates]]
product = "sugar"
period = 0
rate = 4.0
"#;

const CHILE: &str = r#"
[[regions]]
name = "chile"

[regions.root]
name = "land"
sigma = 1.0
land_allocation = [100.0, 100.0, 100.0]

[[regions.root.children]]
type = "leaf"
name = "corn"

[[regions.root.children]]
type = "node"
name = "reserve"
sigma = 1.0

[[regions.root.children.children]]
type = "unmanaged"
name = "forest"
base_land_allocation = [30.0, 30.0, 30.0]
base_intrinsic_rate = [1.0, 1.0, 1.0]

[[regions.root.children.children]]
type = "unmanaged"
name = "grass"
base_land_allocation = [10.0, 10.0, 10.0]
base_intrinsic_rate = [1.0, 1.0, 1.0]
"#;

fn chile(corn: f64) -> String {
    format!(
        r#"{CHILE}
[[regions.calibration]]
kind = "land"
product = "corn"
value = {corn:?}
period = 0
"#
    )
}

fn service_with(fs: MemoryFileSystem) -> ScenarioService {
    ScenarioService::new(
        Arc::new(fs),
        ModelContext::new(2005, 5, 3).unwrap(),
        Diagnostics::default(),
    )
}

#[fixture]
fn service() -> ScenarioService {
    testing::init_test_setup();
    service_with(
        MemoryFileSystem::new()
            .with_file("usa.toml", USA)
            .with_file("both.toml", format!("{USA}\n{BRAZIL}"))
            .with_file("brazil.toml", BRAZIL)
            .with_file("chile_full.toml", chile(100.0))
            .with_file("chile_over.toml", chile(130.0)),
    )
}

fn load(service: &ScenarioService, path: &str) -> ScenarioDef {
    service.load(Path::new(path)).expect("load scenario")
}

#[rstest]
fn given_scenario_file_on_disk_when_loading_then_parses_regions() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path: PathBuf = temp.path().join("scenario.toml");
    std::fs::write(&path, USA).unwrap();
    let service = ScenarioService::new(
        Arc::new(RealFileSystem),
        ModelContext::new(2005, 5, 3).unwrap(),
        Diagnostics::default(),
    );

    // Act
    let scenario = service.load(&path).unwrap();

    // Assert
    assert_eq!(scenario.regions.len(), 1);
    assert_eq!(scenario.regions[0].calibration.len(), 3);
    assert_eq!(scenario.regions[0].rates.len(), 2);
}

#[rstest]
fn given_missing_file_when_loading_then_scenario_error(service: ScenarioService) {
    // Act
    let result = service.load(Path::new("nope.toml"));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Scenario { .. })));
}

#[rstest]
fn given_malformed_toml_when_loading_then_error_names_file() {
    // Arrange
    let service = service_with(MemoryFileSystem::new().with_file("bad.toml", "[[regions]\nname ="));

    // Act
    let result = service.load(Path::new("bad.toml"));

    // Assert
    match result {
        Err(ApplicationError::Scenario { path, .. }) => assert_eq!(path, PathBuf::from("bad.toml")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[rstest]
fn given_duplicate_region_when_building_then_rejected(service: ScenarioService) {
    // Arrange
    let mut scenario = load(&service, "usa.toml");
    scenario.regions.push(scenario.regions[0].clone());

    // Act
    let result = service.build(&scenario);

    // Assert
    assert!(matches!(result, Err(ApplicationError::Domain(_))));
}

#[rstest]
fn given_calibration_when_calibrating_then_unmanaged_takes_residual(service: ScenarioService) {
    // Arrange
    let scenario = load(&service, "usa.toml");
    let mut regions = service.build(&scenario).unwrap();

    // Act
    service.calibrate(&mut regions, &scenario, 0).unwrap();

    // Assert
    let usa = regions.get("usa").unwrap();
    assert_eq!(usa.get_land_allocation("corn", 0), 100.0);
    assert_eq!(usa.get_land_allocation("pasture", 0), 100.0);
    assert_eq!(usa.total_land_allocation(0), 200.0);
    assert_eq!(usa.get_yield("", "corn", 0), 7.5);
    assert!((usa.find_item("corn").unwrap().share(0) - 0.8).abs() < EPS);
}

#[rstest]
fn given_production_filling_region_when_calibrating_then_total_unchanged(
    service: ScenarioService,
) {
    // Arrange
    let scenario = load(&service, "chile_full.toml");
    let mut regions = service.build(&scenario).unwrap();

    // Act
    service.calibrate(&mut regions, &scenario, 0).unwrap();

    // Assert
    let chile = regions.get("chile").unwrap();
    assert_eq!(chile.total_land_allocation(0), 100.0);
    assert_eq!(chile.get_land_allocation("reserve", 0), 0.0);
    assert_eq!(chile.get_land_allocation("forest", 0), 0.0);
    assert_eq!(chile.get_land_allocation("corn", 0), 100.0);
}

#[rstest]
fn given_production_above_region_when_calibrating_then_no_unmanaged_land_added(
    service: ScenarioService,
) {
    // Arrange
    let scenario = load(&service, "chile_over.toml");
    let mut regions = service.build(&scenario).unwrap();

    // Act
    service.calibrate(&mut regions, &scenario, 0).unwrap();

    // Assert
    let chile = regions.get("chile").unwrap();
    assert_eq!(chile.get_land_allocation("reserve", 0), 0.0);
    assert_eq!(chile.total_land_allocation(0), 130.0);
}

#[rstest]
fn given_calibrated_region_when_computing_yield_then_uses_yield_mode(service: ScenarioService) {
    // Arrange
    let scenario = load(&service, "usa.toml");
    let mut regions = service.build(&scenario).unwrap();
    service.calibrate(&mut regions, &scenario, 0).unwrap();
    let usa = regions.get_mut("usa").unwrap();

    // Act: root rate 5, corn share 0.8 -> yield mode 4
    usa.calc_yield_internal("", "corn", 2.0, 0.0, 0);

    // Assert
    assert!((usa.get_yield("", "corn", 0) - 2.0).abs() < EPS);
}

#[rstest]
fn given_ag_prod_change_when_computing_later_yield_then_compounds_over_timestep(
    service: ScenarioService,
) {
    // Arrange
    let scenario = load(&service, "usa.toml");
    let mut regions = service.build(&scenario).unwrap();
    service.calibrate(&mut regions, &scenario, 0).unwrap();
    let usa = regions.get_mut("usa").unwrap();

    // Act
    usa.calc_yield_internal("", "corn", 2.0, 3.0, 1);

    // Assert
    let expected = 3.0 / 2.0 * 1.01f64.powi(5);
    assert!((usa.get_yield("", "corn", 1) - expected).abs() < EPS);
}

#[rstest]
fn given_scenario_when_simulating_then_each_period_conserves_land(service: ScenarioService) {
    // Arrange
    let scenario = load(&service, "usa.toml");

    // Act
    let regions = service.simulate(&scenario, 1).unwrap();

    // Assert
    let usa = regions.get("usa").unwrap();
    assert!((usa.get_land_allocation("corn", 0) - 160.0).abs() < EPS);
    assert!((usa.get_land_allocation("pasture", 0) - 40.0).abs() < EPS);
    assert!((usa.get_land_allocation("corn", 1) - 100.0).abs() < EPS);
    assert!((usa.get_land_allocation("pasture", 1) - 100.0).abs() < EPS);
}

#[rstest]
fn given_zero_total_in_later_period_when_running_then_previous_total_carried(
    service: ScenarioService,
) {
    // Arrange
    let scenario = load(&service, "brazil.toml");

    // Act
    let regions = service.simulate(&scenario, 1).unwrap();

    // Assert
    let brazil = regions.get("brazil").unwrap();
    assert_eq!(brazil.total_land_allocation(1), 500.0);
    let total = brazil.get_land_allocation("soy", 0) + brazil.get_land_allocation("sugar", 0);
    assert!((total - 500.0).abs() < 1e-6);
}

#[rstest]
fn given_several_regions_when_simulating_in_parallel_then_matches_single_region_runs(
    service: ScenarioService,
) {
    // Arrange
    let both = load(&service, "both.toml");
    let usa = load(&service, "usa.toml");
    let brazil = load(&service, "brazil.toml");

    // Act
    let together = service.simulate(&both, 2).unwrap();
    let alone_usa = service.simulate(&usa, 2).unwrap();
    let alone_brazil = service.simulate(&brazil, 2).unwrap();

    // Assert
    for period in 0..3 {
        let combined = AllocationReport::for_regions(&together, period);
        let mut separate = AllocationReport::for_regions(&alone_usa, period);
        separate
            .rows
            .extend(AllocationReport::for_regions(&alone_brazil, period).rows);
        assert_eq!(combined.rows, separate.rows);
    }
}

#[rstest]
#[case(3)]
#[case(10)]
fn given_period_beyond_horizon_when_running_then_out_of_range(
    service: ScenarioService,
    #[case] period: usize,
) {
    // Arrange
    let scenario = load(&service, "usa.toml");

    // Act
    let result = service.simulate(&scenario, period);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::PeriodOutOfRange { period_count: 3, .. })
    ));
}
