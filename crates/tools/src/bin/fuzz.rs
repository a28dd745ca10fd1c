use anyhow::{Context, Result, ensure};
use clap::Parser;
use nav_core::{
    Action, MapDescription, PackageSpec, Pos, RunOutcome, Simulator, SpecialEdge, Utility,
    UtilityEntry, ValueIteration, World, resolve_instance,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 200)]
    cases: u32,
}

const MAX_FRAGILE: usize = 4;
const PROBABILITIES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

fn below(rng: &mut ChaCha8Rng, bound: usize) -> usize {
    rng.next_u64() as usize % bound
}

fn random_pos(rng: &mut ChaCha8Rng, rows: usize, cols: usize) -> Pos {
    Pos::new(below(rng, rows) as i32, below(rng, cols) as i32)
}

fn random_map(rng: &mut ChaCha8Rng) -> MapDescription {
    let rows = 1 + below(rng, 4);
    let cols = 1 + below(rng, 4);
    let mut edges = Vec::new();
    let mut fragile = 0;
    for row in 0..rows as i32 {
        for col in 0..cols as i32 {
            let from = Pos::new(row, col);
            for to in [Pos::new(row + 1, col), Pos::new(row, col + 1)] {
                if to.row >= rows as i32 || to.col >= cols as i32 {
                    continue;
                }
                match below(rng, 6) {
                    0 => edges.push(SpecialEdge::always_blocked(from, to)),
                    1 | 2 if fragile < MAX_FRAGILE => {
                        fragile += 1;
                        let p = PROBABILITIES[below(rng, PROBABILITIES.len())];
                        edges.push(SpecialEdge::fragile(from, to, p));
                    }
                    _ => {}
                }
            }
        }
    }
    let pickup = random_pos(rng, rows, cols);
    MapDescription {
        rows,
        cols,
        packages: vec![PackageSpec {
            pickup,
            appears_at: 0,
            deliver_to: random_pos(rng, rows, cols),
            deadline: 1000,
        }],
        edges,
        agents: vec![pickup],
    }
}

fn check_tables(engine: &mut ValueIteration) -> Result<()> {
    let goal = engine.goal();
    for table in engine.tables() {
        for (belief, entry) in table.entries() {
            if table.location() == goal {
                ensure!(
                    *entry == UtilityEntry { value: Utility::GOAL, action: Some(Action::NoOp) },
                    "goal entry {belief} is {entry:?}"
                );
            }
            ensure!(
                entry.value <= Utility::GOAL,
                "value {} above zero at {} {belief}",
                entry.value,
                table.location()
            );
        }
    }
    let keys = engine.space().keys().to_vec();
    for key in &keys {
        let updates = engine.relax_pass(key)?;
        ensure!(updates == 0, "belief {key} not at a fixed point ({updates} updates)");
    }
    Ok(())
}

fn run_case(rng: &mut ChaCha8Rng) -> Result<RunOutcome> {
    let map = random_map(rng);
    let world = World::new(&map)?;
    let mut engine = ValueIteration::for_world(&world)?;
    engine.solve()?;
    check_tables(&mut engine).with_context(|| format!("map {map:?}"))?;
    engine.find_policy().with_context(|| format!("policy walk on {map:?}"))?;

    let instance = resolve_instance(&map, rng.next_u64())?;
    let max_ticks = (map.rows * map.cols * (engine.fragile_edges().len() + 1)) as u32 + 1;
    let report = Simulator::new(World::new(&instance)?, &engine).run(max_ticks)?;
    ensure!(
        report.outcome != RunOutcome::TickBudgetExhausted,
        "agent wandered for {max_ticks} ticks on {instance:?}"
    );
    Ok(report.outcome)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Starting fuzz harness on seed {} for {} cases...", args.seed, args.cases);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let (mut delivered, mut stuck) = (0, 0);
    for case in 0..args.cases {
        match run_case(&mut rng).with_context(|| format!("case {case}"))? {
            RunOutcome::Delivered => delivered += 1,
            RunOutcome::Stuck => stuck += 1,
            RunOutcome::Expired | RunOutcome::TickBudgetExhausted => {}
        }
    }

    println!("Fuzzing completed successfully: {delivered} delivered, {stuck} stuck.");
    Ok(())
}
