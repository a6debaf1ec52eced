#![no_main]

use libfuzzer_sys::fuzz_target;
use qorcompare::pairwise::compare_all_metrics;
use qorcompare::table::MetricTable;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing arbitrary JSON must never panic, and neither may
        // summarizing whatever table comes out of it
        if let Ok(table) = MetricTable::from_json_str(input) {
            let selection = table.all_case_names();
            for base in table.algorithm_names() {
                for compare in table.algorithm_names() {
                    let _ = compare_all_metrics(&table, &base, &compare, &selection);
                }
            }
        }
    }
});
