use akin::{
    estimate_similarity, Akin, AkinConfig, GroupResult, HashTemplate, Row, SignatureConfig,
    SignaturePipeline,
};

fn rows() -> Vec<Row> {
    let names = [
        "Acme Corp",
        "ACME CORP",
        "Acme Corporation",
        "Beta LLC",
        "Beta L.L.C.",
        "beta llc",
        "Gamma Inc",
        "Gamma Incorporated",
        "Delta Ltd",
        "",
        "Epsilon GmbH",
        "epsilon gmbh",
    ];
    names
        .iter()
        .map(|n| Row::new().with("name", *n).with("country", "NO"))
        .collect()
}

fn build(workers: usize, template: HashTemplate) -> GroupResult {
    let mut config = AkinConfig::in_memory();
    config.pipeline.workers = Some(workers);
    let mut akin = Akin::open(config).expect("engine");
    akin.add_datasource("companies", rows()).unwrap();
    let name = template.name.clone();
    akin.add_template(template).unwrap();
    akin.create_group("companies", "name", &name, true)
        .unwrap()
        .clone()
}

#[test]
fn independent_runs_produce_identical_groups() {
    for template in [
        HashTemplate::new("Loose", 0.5),
        HashTemplate::new("Shingled", 0.7).with_shingles(3),
    ] {
        let a = build(1, template.clone());
        let b = build(1, template.clone());
        assert_eq!(a, b, "{}", template.name);
    }
}

#[test]
fn worker_count_does_not_change_results() {
    let serial = build(1, HashTemplate::new("Loose", 0.5));
    for workers in [2, 3, 7] {
        assert_eq!(build(workers, HashTemplate::new("Loose", 0.5)), serial);
    }
}

#[test]
fn identical_token_sets_have_identical_signatures() {
    let pipeline = SignaturePipeline::new(Some(2)).unwrap();
    let sigs = pipeline
        .sign_all(
            &["gamma  beta alpha", "alpha beta gamma", "Alpha Beta Gamma alpha"],
            &SignatureConfig::default(),
        )
        .unwrap();
    assert_eq!(sigs[0].signature, sigs[1].signature);
    assert_eq!(sigs[1].signature, sigs[2].signature);
    assert_eq!(
        estimate_similarity(&sigs[0].signature, &sigs[2].signature).unwrap(),
        1.0
    );
}
