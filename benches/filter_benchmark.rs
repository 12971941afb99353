use criterion::{black_box, criterion_group, criterion_main, Criterion};
use regex::Regex;

#[derive(Debug, Clone)]
struct RawHit {
    title: String,
    author_name: Vec<String>,
    language: Vec<String>,
    subject: Vec<String>,
}

const NON_ENGLISH_SUBJECTS: &[&str] = &[
    "chinese", "spanish", "french", "german", "japanese", "korean", "arabic", "russian",
    "portuguese", "italian", "dutch", "hindi", "bengali", "urdu", "persian", "turkish",
    "hebrew", "polish", "czech", "hungarian", "swedish", "norwegian", "danish", "finnish",
    "greek", "vietnamese", "thai", "indonesian", "malay", "filipino", "tagalog",
];

fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}'
            | '\u{3040}'..='\u{309f}'
            | '\u{30a0}'..='\u{30ff}'
            | '\u{ac00}'..='\u{d7af}'
        )
    })
}

fn passes_language_gate(hit: &RawHit) -> bool {
    if hit.title.trim().is_empty() || hit.author_name.is_empty() {
        return false;
    }

    if !hit.language.is_empty() {
        let has_english = hit.language.iter().any(|lang| {
            matches!(
                lang.trim().to_lowercase().as_str(),
                "eng" | "en" | "english" | "en-us" | "en-gb" | "en-ca" | "en-au"
            )
        });
        if !has_english {
            return false;
        }
    }

    if contains_cjk(&hit.title) || hit.author_name.iter().any(|a| contains_cjk(a)) {
        return false;
    }

    !hit.subject.iter().any(|subject| {
        let lower = subject.to_lowercase();
        NON_ENGLISH_SUBJECTS.iter().any(|term| lower.contains(term))
    })
}

fn is_likely_author_name(query: &str, word_pattern: &Regex) -> bool {
    let words: Vec<&str> = query.trim().split_whitespace().collect();
    if words.len() < 2 || words.len() > 4 {
        return false;
    }
    words.iter().all(|word| word_pattern.is_match(word))
}

fn create_sample_hits() -> Vec<RawHit> {
    let mut hits = Vec::new();

    hits.push(RawHit {
        title: "Pride and Prejudice".to_string(),
        author_name: vec!["Jane Austen".to_string()],
        language: vec!["eng".to_string()],
        subject: vec!["Fiction".to_string(), "Romance".to_string()],
    });

    hits.push(RawHit {
        title: "\u{4e09}\u{4f53}".to_string(),
        author_name: vec!["Liu Cixin".to_string()],
        language: vec!["chi".to_string()],
        subject: vec!["Chinese fiction".to_string()],
    });

    // Bulk synthetic hits for benchmarking
    for i in 0..1000 {
        hits.push(RawHit {
            title: format!("Test Book {}", i),
            author_name: vec![format!("Test Author {}", i % 50)],
            language: if i % 3 == 0 {
                vec![]
            } else {
                vec!["en".to_string()]
            },
            subject: vec!["Fiction".to_string(), format!("Subject {}", i % 20)],
        });
    }

    hits
}

fn benchmark_language_gate(c: &mut Criterion) {
    let hits = create_sample_hits();

    c.bench_function("language_gate_1000_hits", |b| {
        b.iter(|| {
            let kept = hits
                .iter()
                .filter(|hit| passes_language_gate(black_box(hit)))
                .count();
            black_box(kept)
        })
    });
}

fn benchmark_author_heuristic(c: &mut Criterion) {
    let word_pattern = Regex::new(r"^(?:[A-Z][a-z]+(?:-[A-Z][a-z]+)?|(?:[A-Z]\.)+)$").unwrap();
    let queries = [
        "J.K. Rowling",
        "Stephen King",
        "harry potter",
        "the great gatsby",
        "Ursula Le-Guin",
        "dune frank herbert 1965",
    ];

    c.bench_function("author_name_heuristic", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(is_likely_author_name(black_box(query), &word_pattern));
            }
        })
    });
}

criterion_group!(benches, benchmark_language_gate, benchmark_author_heuristic);
criterion_main!(benches);
