//! Benchmarks for the ingest → IR → emit pipeline using divan.
//!
//! Run with: cargo bench

use cmdgen::emit_header;
use cmdgen::emit_pod;
use cmdgen::ingest::ingest;
use divan::Bencher;
use ecow::EcoString;
use foldhash::fast::RandomState;
use std::collections::HashSet;

fn main() {
    divan::main();
}

fn sample_declarations(n_commands: usize) -> String {
    let mut xml = String::from(
        r#"<usage program="sample" summary="a sample command suite">
<synopsis/>
<optgroup name="common" forward="yes" human="Common">
  <option short="v" long="verbose"/>
  <option long="lang" arg="LANG" accumulate="langs"/>
</optgroup>
"#,
    );
    for i in 0..n_commands {
        xml.push_str(&format!(
            "<command names=\"cmd-{i}\"><optgroup-reference name=\"common\"/><argument name=\"target\"/></command>\n"
        ));
    }
    xml.push_str("</usage>\n");
    xml
}

#[divan::bench(args = [1, 10, 50])]
fn ingest_pipeline(bencher: Bencher, n_commands: usize) {
    let xml = sample_declarations(n_commands);
    let defs: HashSet<EcoString, RandomState> = HashSet::with_hasher(RandomState::default());
    bencher.bench(|| {
        let doc = roxmltree::Document::parse(&xml).unwrap();
        ingest(&doc, &defs).unwrap()
    });
}

#[divan::bench(args = [1, 10, 50])]
fn header_emission(bencher: Bencher, n_commands: usize) {
    let xml = sample_declarations(n_commands);
    let defs: HashSet<EcoString, RandomState> = HashSet::with_hasher(RandomState::default());
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let ir = ingest(&doc, &defs).unwrap();
    bencher.bench(|| {
        let mut buf: Vec<u8> = Vec::new();
        let mut w = cmdgen::writer::Writer::new(&mut buf);
        emit_header::emit(&mut w, &ir).unwrap();
        buf
    });
}

#[divan::bench(args = [1, 10, 50])]
fn pod_emission(bencher: Bencher, n_commands: usize) {
    let xml = sample_declarations(n_commands);
    let defs: HashSet<EcoString, RandomState> = HashSet::with_hasher(RandomState::default());
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let ir = ingest(&doc, &defs).unwrap();
    bencher.bench(|| {
        let mut buf: Vec<u8> = Vec::new();
        emit_pod::emit(&mut buf, &ir, &doc, &defs).unwrap();
        buf
    });
}
