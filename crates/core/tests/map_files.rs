use nav_core::{NavError, PackageStatus, Pos, SpecialKind, ValueIteration, World, parse_map};
use std::fs;
use std::io::Write;

const DETOUR_MAP: &str = "\
#X 1                ; Maximum x coordinate: 1
#Y 2                ; Maximum y coordinate: 2
#P 0 0 0 D 0 2 30   ; Package 0 at (0,0) from time 0, deliver to (0,2) before time 30
#F 0 1 0 2 0.25     ; Fragile edge
#B 1 0 1 1          ; Always blocked edge
#A 0 0              ; Agent 0 at (0,0)
";

#[test]
fn map_file_round_trips_through_the_world_display() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DETOUR_MAP.as_bytes()).unwrap();

    let text = fs::read_to_string(file.path()).unwrap();
    let map = parse_map(&text).unwrap();
    let world = World::new(&map).unwrap();
    assert_eq!(world.package().status, PackageStatus::Picked);
    assert_eq!(world.grid().special_edges()[0].kind, SpecialKind::Fragile { probability: 0.25 });

    let printed = world.to_string();
    assert!(printed.contains("#X 1 ; Maximum x coordinate: 1"));
    assert!(printed.contains("#E 0 ; Edge 1 (1,0) (1,1): always blocked"));
}

#[test]
fn parsed_map_plans_the_expected_policy() {
    let world = World::new(&parse_map(DETOUR_MAP).unwrap()).unwrap();
    let mut engine = ValueIteration::for_world(&world).unwrap();
    engine.solve().unwrap();
    let policy = engine.find_policy().unwrap();
    assert!(policy.starts_with("At (0,0) with belief [U]: Right"));
    assert!(policy.contains("if Blocked[(0,1) (0,2)]=True:"));
    assert!(policy.contains("At (0,1) with belief [T]: Down"));
    assert_eq!(engine.start(), Pos::new(0, 0));
}

#[test]
fn rejected_maps_surface_typed_errors() {
    let two_agents = format!("{DETOUR_MAP}#A 1 2\n");
    let map = parse_map(&two_agents).unwrap();
    assert!(matches!(World::new(&map), Err(NavError::Validation(_))));

    let diagonal = DETOUR_MAP.replace("#B 1 0 1 1", "#B 1 0 0 1");
    let map = parse_map(&diagonal).unwrap();
    assert!(matches!(World::new(&map), Err(NavError::InvalidEdge { .. })));

    let garbled = DETOUR_MAP.replace("0.25", "quarter");
    assert!(matches!(parse_map(&garbled), Err(NavError::Parse { line: 4, .. })));
}
