use site_lutmap::desc::{parse_site, SiteDescription};
use site_lutmap::mapper::{LutMapper, SiteLutMapping};
use site_lutmap::trace::{LogTrace, MapTrace, NoTrace};
use std::error::Error;

fn print_mapping(site: &SiteDescription, mapping: &SiteLutMapping) {
    let element = &site.element;
    println!("site {} equation {}", element.name, mapping.equation);
    for (mapped, cell) in mapping.cells.iter().zip(site.cells.iter()) {
        println!("cell {} => {}", mapped.cell, element.lut_bels[mapped.bel].name);
        for (cell_pin, &net) in cell.pins.iter().zip(cell.nets.iter()) {
            println!(
                "  {} => {} ({})",
                cell_pin,
                mapped.bel_pins[cell_pin],
                site.net_name(net).unwrap_or("?")
            );
        }
        for (bel_pin, connection) in mapped.pin_connections.iter() {
            println!("  {} : {}", bel_pin, connection);
        }
    }
    for &bel in mapping.blocked_bels.iter() {
        println!("blocked {}", element.lut_bels[bel].name);
    }
    if mapping.pin_mask != 0 {
        let tied: Vec<&str> = element
            .pins
            .iter()
            .enumerate()
            .filter(|(index, _)| mapping.pin_mask & (1 << index) != 0)
            .map(|(_, pin)| pin.as_str())
            .collect();
        println!("tied {}", tied.join(" "));
    }
}

// returns whether a mapping was found
fn run(input: String, trace: bool, check_wires: bool) -> Result<bool, Box<dyn Error>> {
    let mut site = parse_site(&std::fs::read_to_string(input)?)?;

    let mapping = {
        let mut mapper = LutMapper::new(&site.element);
        for cell in site.cells.iter() {
            mapper.add_cell(cell);
        }
        let mut sink: Box<dyn MapTrace> = if trace {
            Box::new(LogTrace)
        } else {
            Box::new(NoTrace)
        };
        match mapper.remap_luts(&mut *sink) {
            Ok(mapping) => mapping,
            Err(reason) => {
                println!("no mapping: {reason}");
                return Ok(false);
            }
        }
    };
    print_mapping(&site, &mapping);

    if check_wires {
        mapping.apply(&mut site.cells);
        let mut mapper = LutMapper::new(&site.element);
        for cell in site.cells.iter() {
            mapper.add_cell(cell);
        }
        let pin_mask = mapper.check_current_wires();
        assert_eq!(pin_mask, mapping.pin_mask, "committed bindings disagree with the mapping");
        println!("wires ok");
    }
    Ok(true)
}

fn main() {
    let mut input = String::new();
    let mut trace = false;
    let mut check_wires = false;
    {
        let mut parser = argparse::ArgumentParser::new();
        parser
            .refer(&mut input)
            .add_argument("INPUT", argparse::Store, "Site description")
            .required();
        parser.refer(&mut trace).add_option(
            &["--trace"],
            argparse::StoreTrue,
            "Log each step of the pin assignment",
        );
        parser.refer(&mut check_wires).add_option(
            &["--check-wires"],
            argparse::StoreTrue,
            "Commit the mapping and re-check spare pins against it",
        );
        parser.parse_args_or_exit();
    }

    let mut logger = env_logger::Builder::from_default_env();
    if trace {
        logger.filter_module("lut_rotation", log::LevelFilter::Debug);
    }
    logger.init();

    match run(input, trace, check_wires) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(error) => {
            eprintln!("error: {}", error);
            std::process::exit(1)
        }
    }
}
