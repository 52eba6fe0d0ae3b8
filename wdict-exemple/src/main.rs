use log::info;
use wdict_core::model::selection::{pick_by_key, pick_random, select_group};
use wdict_core::model::selection_input::{OutputFormat, SelectionInput};
use wdict_core::model::template::render;
use wdict_core::model::weighted_dict::{WeightedDict, build, concat, reformat};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug shows the selection decisions of the core
    env_logger::init();

    // Build two dictionaries from (key, value, weight) entries
    let animals = build([
        ("animal", "cat", 2.0),
        ("sound", "meow", 1.0),
        ("place", "garden", 1.0),
    ])?;
    let overrides = build([
        ("sound", "purr", 3.0),
        ("mood", "sleepy", 0.5),
    ])?;

    // Later dictionaries override earlier ones key by key
    let merged = concat([&animals, &overrides])?;
    let dict = reformat(&merged)?;
    println!("Merged dictionary: {}", serde_json::to_string_pretty(&dict)?);

    // Weighted random pick, using the thread-local random source
    let mut rng = rand::rng();
    println!("Random value: {}", pick_random(&dict, &mut rng)?);

    // Explicit pick by key
    println!("Sound: {}", pick_by_key(&dict, "sound", OutputFormat::WeightedText)?);

    // Asking for a missing key fails with the key name
    match pick_by_key(&dict, "unknown", OutputFormat::Simple) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Expected error: {e}"),
    }

    // Random group of 2 distinct entries
    let mut input = SelectionInput::random(2)?;
    input.format = OutputFormat::WeightedText;
    let selection = select_group(&dict, &input, &mut rng)?;
    println!("Random group:\n{}", selection.formatted);

    // Explicit group, quoted keys may contain delimiters
    let input = SelectionInput::explicit("animal; place, 'mood'").with_format(OutputFormat::Simple);
    let selection = select_group(&dict, &input, &mut rng)?;
    println!("Explicit group:\n{}", selection.formatted);
    info!("explicit group residual has {} entries", selection.residual.len());

    // Render a template from the merged dictionary
    let template = "A {{ animal }} in the {{place}} says {{ sound }} ({{ missing }})";
    println!("{}", render(template, &WeightedDict::from(merged)));

    Ok(())
}
