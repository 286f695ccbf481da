use coolfront::{grammar::CoolParser, lexer::tokenize};
use criterion::{criterion_group, criterion_main, Criterion};

criterion_main!(benches);
criterion_group!(benches, bench_cool);

const PROGRAM: &str = r#"
class List {
    isNil(): Bool { true };
    head(): Int { { abort(); 0; } };
    tail(): List { { abort(); self; } };
    cons(i: Int): List { (new Cons).init(i, self) };
};

class Cons inherits List {
    car: Int;
    cdr: List;
    isNil(): Bool { false };
    head(): Int { car };
    tail(): List { cdr };
    init(i: Int, rest: List): List { { car <- i; cdr <- rest; self; } };
};

class Main inherits IO {
    print_list(l: List): Object {
        if l.isNil() then out_string("\n")
        else { out_int(l.head()); out_string(" "); print_list(l.tail()); }
        fi
    };
    main(): Object {
        let l: List <- new List in
            while l.head() < 10 loop l <- l.cons(l.head() + 1) pool
    };
};
"#;

fn bench_cool(c: &mut Criterion) {
    let mut group = c.benchmark_group("cool");
    group.sample_size(10);
    group.bench_function("build_parser", |b| {
        b.iter(CoolParser::new);
    });

    let parser = CoolParser::new().unwrap();
    let tokens = tokenize(PROGRAM);
    group.bench_function("parse", |b| {
        b.iter(|| parser.parse(&tokens.tokens));
    });
    group.bench_function("compile", |b| {
        b.iter(|| coolfront::compile(PROGRAM));
    });
    group.finish();
}
