use std::fs;
use std::path::Path;

use listing_features::config::PipelineConfig;
use listing_features::engineer::ReferenceData;
use listing_features::listing::RawListing;
use listing_features::{build_tables, run, PipelineError};
use rust_xlsxwriter::Workbook;

const HEADER: [&str; 32] = [
    "title", "type", "price", "district", "address", "road", "tenure", "bedroom", "area", "land",
    "psf", "latlon",
    "first_p_school", "first_p_school_dist", "sec_p_school", "sec_p_school_dist", "third_p_school", "third_p_school_dist",
    "first_i_school", "first_i_school_dist", "sec_i_school", "sec_i_school_dist", "third_i_school", "third_i_school_dist",
    "first_mrt_name", "first_mrt_dist", "sec_mrt_name", "sec_mrt_dist", "third_mrt_name", "third_mrt_dist",
    "bathroom", "floor",
];

const CONDO: [&str; 32] = [
    "Sunny condo", "type: condominium", "S$ 1,000,000", "D09", "address: 10 Orchard Rd", "Orchard Rd",
    "99-year leasehold", "3", "500 sqft", "", "", "https://maps.example.com/?q=1.3040,103.8320",
    "Raffles Girls Primary", "0.4 km", "Anglo-Chinese Primary", "1.2 km", "St Margaret's", "1.8 km",
    "Tanglin Trust School", "2.1 km", "ISS International", "2.5 km", "Chatsworth", "3.0 km",
    "Orchrd", "0.3 km", "Somerset", "0.8 km", "Newton", "1.6 km",
    "2", "12",
];

const LOFT: [&str; 32] = [
    "Loft", "type: loft", "S$ 900,000", "D03", "address: 1 Loft Lane", "Loft Lane",
    "freehold", "2", "700", "", "", "",
    "", "", "", "", "", "",
    "", "", "", "", "", "",
    "", "", "", "", "", "",
    "1", "",
];

const NO_DISTRICT: [&str; 32] = [
    "Flat", "type: hdb", "S$ 450,000", "", "address: 5 Bedok Nth", "Bedok Nth",
    "99-year", "4+", "", "1,100 sqft", "", "https://maps.example.com/?q=1.33,103.93",
    "", "", "", "", "", "",
    "", "", "", "", "", "",
    "", "", "", "", "", "",
    "1", "",
];

fn write_inputs(dir: &Path) {
    let mut listings = csv::Writer::from_path(dir.join("scraped_data.csv")).unwrap();
    for row in [HEADER, CONDO, LOFT, NO_DISTRICT] {
        listings.write_record(row).unwrap();
    }
    listings.flush().unwrap();

    let points = |coords: &[(f64, f64)]| {
        let features: Vec<String> = coords
            .iter()
            .map(|(lon, lat)| {
                format!(
                    r#"{{"type":"Feature","properties":{{}},"geometry":{{"type":"Point","coordinates":[{},{},0.0]}}}}"#,
                    lon, lat
                )
            })
            .collect();
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
    };
    fs::write(
        dir.join("supermarkets-geojson.geojson"),
        points(&[(103.8321, 1.3041), (103.95, 1.35)]),
    )
    .unwrap();
    fs::write(
        dir.join("hawker-centres-geojson.geojson"),
        points(&[(103.84, 1.30)]),
    )
    .unwrap();

    fs::write(
        dir.join("mrtsg.csv"),
        "OBJECTID,STN_NAME,STN_NO,COLOR\n\
         1,ORCHARD,NS22,RED\n\
         2,ORCHARD,TE14,BROWN\n\
         3,SOMERSET,NS23,RED\n\
         4,NEWTON,NS21,RED\n\
         5,NEWTON,DT11,BLUE\n\
         6,SENGKANG,STC,OTHERS\n",
    )
    .unwrap();

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("primary school").unwrap();
        sheet.write_string(0, 0, "primary_school").unwrap();
        sheet.write_string(0, 1, "admission_rate").unwrap();
        sheet.write_string(0, 2, "score").unwrap();
        sheet.write_string(1, 0, "Raffles Girls' Primary School").unwrap();
        sheet.write_number(1, 1, 0.35).unwrap();
        sheet.write_number(1, 2, 97.0).unwrap();
        sheet.write_string(2, 0, "Anglo-Chinese School (Primary)").unwrap();
        sheet.write_number(2, 1, 0.4).unwrap();
        sheet.write_number(2, 2, 95.0).unwrap();
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("shops").unwrap();
        sheet.write_string(0, 0, "shopping_mall").unwrap();
        sheet.write_string(0, 1, "lat").unwrap();
        sheet.write_string(0, 2, "lon").unwrap();
        sheet.write_string(1, 0, "ION Orchard").unwrap();
        sheet.write_number(1, 1, 1.3040).unwrap();
        sheet.write_number(1, 2, 103.8320).unwrap();
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("international school").unwrap();
        sheet.write_string(0, 0, "school").unwrap();
        sheet.write_string(0, 1, "mapped").unwrap();
        sheet.write_string(1, 0, "Tanglin Trust").unwrap();
        sheet.write_string(1, 1, "Tanglin Trust School").unwrap();
    }
    workbook.save(dir.join("extra_info.xlsx")).unwrap();
}

fn config_for(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.inputs.rebase(dir);
    config.outputs.analysis = dir.join("engineered_data.csv");
    config.outputs.model = dir.join("model_data.csv");
    config
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().iter().map(str::to_owned).collect();
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(str::to_owned).collect())
        .collect();
    (headers, rows)
}

fn column<'a>(headers: &[String], row: &'a [String], name: &str) -> &'a str {
    let idx = headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("no column {}", name));
    &row[idx]
}

#[test]
fn only_valid_row_survives_cleaning() {
    let raw = vec![
        RawListing {
            property_type: Some("condominium".into()),
            price: Some("S$ 1,000,000".into()),
            district: Some("D09".into()),
            ..Default::default()
        },
        RawListing {
            property_type: Some("loft".into()),
            price: Some("S$ 1,000,000".into()),
            district: Some("D09".into()),
            ..Default::default()
        },
    ];
    let (analysis, _, stats) = build_tables(raw, &ReferenceData::default(), &PipelineConfig::default());
    assert_eq!(stats.kept(), 1);
    assert_eq!(stats.unknown_type, 1);
    assert_eq!(analysis.rows.len(), 1);
    assert_eq!(analysis.rows[0].listing.property_type, "condominium");
    assert_eq!(analysis.rows[0].listing.price, 1_000_000.0);
}

#[test]
fn full_run_writes_both_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let config = config_for(dir.path());

    let summary = run(&config).unwrap();
    assert_eq!(summary.clean.input, 3);
    assert_eq!(summary.clean.unknown_type, 1);
    assert_eq!(summary.clean.missing_district, 1);
    assert_eq!(summary.analysis_rows, 1);
    assert_eq!(summary.model_rows, 1);

    let (headers, rows) = read_csv(&config.outputs.analysis);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(column(&headers, row, "type"), "condominium");
    assert_eq!(column(&headers, row, "address"), "10 Orchard Rd");
    assert_eq!(column(&headers, row, "price"), "1000000");
    assert_eq!(column(&headers, row, "psf"), "2000");
    assert_eq!(column(&headers, row, "tenure"), "99");
    assert_eq!(column(&headers, row, "num_p_school_in_1km"), "1");
    assert_eq!(column(&headers, row, "num_mrt_in_1km"), "2");
    assert_eq!(column(&headers, row, "score"), "97");
    assert_eq!(column(&headers, row, "in_top_20"), "true");
    assert_eq!(column(&headers, row, "nearest_mrt_color"), "MULTI");
    assert_eq!(column(&headers, row, "BROWN"), "1");
    assert_eq!(column(&headers, row, "dist_to_shops"), "0");
    assert_eq!(column(&headers, row, "floor"), "12");
    assert!(!headers.iter().any(|h| h == "bathroom" || h == "title"));

    let (model_headers, model_rows) = read_csv(&config.outputs.model);
    assert_eq!(model_rows.len(), 1);
    for dropped in ["address", "road", "district", "type", "tenure", "nearest_mrt_color", "first_mrt_name"] {
        assert!(!model_headers.iter().any(|h| h == dropped), "{} in model table", dropped);
    }
    let model_row = &model_rows[0];
    assert_eq!(column(&model_headers, model_row, "condominium"), "1");
    assert_eq!(column(&model_headers, model_row, "terrace_house"), "0");
    assert_eq!(column(&model_headers, model_row, "in_top_20"), "1");
    assert_eq!(column(&model_headers, model_row, "floor"), "12");
    assert!(model_row.iter().all(|c| !c.is_empty()));
}

#[test]
fn missing_input_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    fs::remove_file(dir.path().join("mrtsg.csv")).unwrap();
    let config = config_for(dir.path());

    let err = run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Csv { .. }));
    assert!(err.to_string().contains("mrtsg.csv"));
    assert!(!config.outputs.analysis.exists());
    assert!(!config.outputs.model.exists());
}

#[test]
fn failed_model_write_leaves_no_analysis_file() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let mut config = config_for(dir.path());
    config.outputs.model = dir.path().join("no-such-dir").join("model_data.csv");

    let err = run(&config).unwrap_err();
    assert!(err.to_string().contains("model_data.csv"));
    assert!(!config.outputs.analysis.exists());
}

#[test]
fn missing_sheet_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let mut config = config_for(dir.path());
    config.sheets.shops = "malls".into();

    let err = run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSheet { ref sheet, .. } if sheet == "malls"));
}
