pub mod table;
pub mod json;

use crate::scan::CycleReport;

pub fn print_cycle(report: &CycleReport, json_output: bool, verbose: bool) {
    if json_output {
        println!("{}", json::render(report));
    } else {
        print!("{}", table::cycle(report, verbose));
        print_diagnostics(report, verbose);
    }
}

fn print_diagnostics(report: &CycleReport, verbose: bool) {
    if report.diagnostics.is_empty() {
        return;
    }

    println!();
    if verbose {
        println!("Diagnostics:");
        println!("{}", "-".repeat(40));
        for diagnostic in &report.diagnostics {
            println!("  {diagnostic}");
        }
    } else {
        for diagnostic in &report.diagnostics {
            println!("[diagnostic] {diagnostic}");
        }
    }
}
