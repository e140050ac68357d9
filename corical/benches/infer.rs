use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use corical::{Config, ProbabilityModel};
use itertools::Itertools;
use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// XDSL for `depth` layers of `width` nodes with `nc` states, each node having every node of
/// the previous layer as parent.
fn gen_layered(depth: usize, width: usize, nc: usize) -> String {
    let states = (0..nc).map(|s| format!(r#"<state id="s{}"/>"#, s)).join("");
    let mut nodes = String::new();
    for l in 0..depth {
        for w in 0..width {
            let nparents = if l == 0 { 0 } else { width };
            let rows = nc.pow(nparents as u32);
            let probas = Array1::<f64>::random(rows * nc, Uniform::new(0.01, 1.0))
                .exact_chunks(nc)
                .into_iter()
                .flat_map(|row| {
                    let s = row.sum();
                    row.iter().map(move |p| p / s).collect::<Vec<_>>()
                })
                .join(" ");
            let parents = if l == 0 {
                String::new()
            } else {
                format!(
                    "<parents>{}</parents>",
                    (0..width).map(|p| format!("L{}N{}", l - 1, p)).join(" ")
                )
            };
            nodes.push_str(&format!(
                r#"<cpt id="L{}N{}">{}{}<probabilities>{}</probabilities></cpt>"#,
                l, w, states, parents, probas
            ));
        }
    }
    format!("<smile><nodes>{}</nodes></smile>", nodes)
}

fn bench_layered(c: &mut Criterion) {
    let nc = 3;
    let width = 3;
    let mut group = c.benchmark_group("infer_layered");
    for depth in [2, 8, 32] {
        let model = ProbabilityModel::from_description(
            &gen_layered(depth, width, nc),
            &Config::default().with_tolerance(1e-6),
        )
        .unwrap();
        let mut ev = model.new_evidence();
        for w in 0..width {
            model.bind_prior(&mut ev, &format!("L0N{}", w)).unwrap();
        }
        let target = format!("L{}N0", depth - 1);
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| model.infer(&ev, &target).unwrap())
        });
    }
    group.finish();
}

fn bench_vaccine(c: &mut Criterion) {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/vaccine.xdsl");
    let model = ProbabilityModel::load(path, &Config::default()).unwrap();
    let mut ev = model.new_evidence();
    model.bind_hard(&mut ev, "n1_Dose", "Two").unwrap();
    model.bind_hard(&mut ev, "n2_Age", "Age_30_59").unwrap();
    model.bind_hard(&mut ev, "n3_Sex", "Female").unwrap();
    model.bind_hard(&mut ev, "n4_Transmission", "High").unwrap();
    c.bench_function("infer_vaccine", |b| {
        b.iter(|| {
            model
                .infer_many(&ev, ["n5_Infection", "n6_Myocarditis", "n7_Die_from_COVID19"])
                .unwrap()
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = bench_layered, bench_vaccine
}
criterion_main!(benches);
