//! Property tests for the compiler and matcher.

use pinyin_regex::regexp::{compile_ast, parse_pattern, Nfa};
use pinyin_regex::{
    compile, is_match, MatchOptions, PinyinTokenizer, ReadingTable, Token, Tokenize,
    TokenizeOptions,
};
use proptest::prelude::*;

fn pool() -> Vec<Token> {
    vec![
        Token::new("音", '音', ["yin", "y", "音"]),
        Token::new("乐", '乐', ["yue", "y", "le", "l", "乐"]),
        Token::new("中", '中', ["zhong", "zh", "zong", "z", "中"]),
        Token::new("家", '家', ["jia", "j", "家"]),
        Token::literal_only('7'),
    ]
}

fn tokens_strategy(max_len: usize) -> impl Strategy<Value = Vec<Token>> {
    let pool = pool();
    prop::collection::vec(0..pool.len(), 0..=max_len)
        .prop_map(move |picks| picks.into_iter().map(|i| pool[i].clone()).collect())
}

/// Patterns that always parse.
fn pattern_strategy() -> impl Strategy<Value = String> {
    let leaf = prop::sample::select(vec![
        "y", "yin", "yue", "le", "z", "zh", "zong", "jia", ".", "[yl]", "[^z]", r"\z", r"\d", r"\W",
    ])
    .prop_map(str::to_string);

    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{}{}", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({}|{})", a, b)),
            inner.clone().prop_map(|a| format!("({})*", a)),
            inner.clone().prop_map(|a| format!("({})+", a)),
            inner.clone().prop_map(|a| format!("({})?", a)),
            (inner, 0u32..3, 0u32..3)
                .prop_map(|(a, m, extra)| format!("({}){{{},{}}}", a, m, m + extra)),
        ]
    })
}

fn build(pattern: &str) -> Nfa {
    compile_ast(&parse_pattern(pattern).unwrap()).unwrap()
}

fn accepts(pattern: &str, tokens: &[Token]) -> bool {
    compile(pattern).unwrap().exec(tokens)
}

fn repeat_token(token: &Token, n: usize) -> Vec<Token> {
    std::iter::repeat(token.clone()).take(n).collect()
}

proptest! {
    #[test]
    fn compile_is_total_with_one_accept(pattern in pattern_strategy()) {
        let nfa = build(&pattern);
        let accepting = nfa.arena().iter().filter(|(_, s)| s.accept).count();
        prop_assert_eq!(accepting, 1);
        prop_assert!(nfa.start().index() < nfa.len());
        prop_assert!(nfa.is_accept(nfa.accept()));
    }

    #[test]
    fn compiling_twice_accepts_the_same(
        pattern in pattern_strategy(),
        tokens in tokens_strategy(6),
    ) {
        let first = compile(&pattern).unwrap();
        let second = compile(&pattern).unwrap();
        prop_assert_eq!(first.exec(&tokens), second.exec(&tokens));
        prop_assert_eq!(first.find(&tokens), second.find(&tokens));
    }

    #[test]
    fn open_repeat_has_no_upper_bound(m in 0usize..20) {
        let yin = &pool()[0];
        let pattern = format!("^y{{{},}}$", m);
        for n in [m, m + 5, m + 50] {
            prop_assert!(accepts(&pattern, &repeat_token(yin, n)), "{} tokens", n);
        }
        if m > 0 {
            prop_assert!(!accepts(&pattern, &repeat_token(yin, m - 1)));
        }
    }

    #[test]
    fn exact_repeat_is_mandatory_copies(m in 0usize..6, n in 0usize..8) {
        let yin = &pool()[0];
        let tokens = repeat_token(yin, n);
        let repeated = format!("^(yin){{{},{}}}$", m, m);
        let spelled = format!("^{}$", "(yin)".repeat(m));
        prop_assert_eq!(accepts(&repeated, &tokens), accepts(&spelled, &tokens));
        prop_assert_eq!(accepts(&repeated, &tokens), n == m);
    }

    #[test]
    fn zero_repeat_matches_empty(pattern in pattern_strategy(), tokens in tokens_strategy(4)) {
        let zero = format!("^({}){{0}}$", pattern);
        prop_assert_eq!(accepts(&zero, &tokens), tokens.is_empty());
    }

    #[test]
    fn start_anchor_only_matches_at_zero(
        pattern in pattern_strategy(),
        tokens in tokens_strategy(6),
    ) {
        let anchored = compile(&format!("^{}", pattern)).unwrap();
        if let Some(found) = anchored.find(&tokens) {
            prop_assert_eq!(found.start, 0);
        }
    }

    #[test]
    fn end_anchor_only_accepts_at_end(
        pattern in pattern_strategy(),
        tokens in tokens_strategy(6),
    ) {
        let anchored = compile(&format!("{}$", pattern)).unwrap();
        if let Some(found) = anchored.find(&tokens) {
            prop_assert_eq!(found.end, tokens.len());
        }
    }

    #[test]
    fn unanchored_match_implies_some_span_matches(
        pattern in pattern_strategy(),
        tokens in tokens_strategy(5),
    ) {
        let regex = compile(&pattern).unwrap();
        let whole = compile(&format!("^({})$", pattern)).unwrap();
        if let Some(found) = regex.find(&tokens) {
            prop_assert!(whole.exec(&tokens[found.range()]));
        } else {
            prop_assert!(!regex.exec(&tokens));
        }
    }
}

const RETROFLEX: &str = "\
U+4E2D: zhōng  # 中
U+8F66: chē  # 车
U+662F: shì  # 是
U+97F3: yīn  # 音
";

proptest! {
    #[test]
    fn fuzzy_mode_agrees_on_literal_patterns(
        ch in prop::sample::select(vec!['中', '车', '是', '音']),
        initials in any::<bool>(),
    ) {
        let tokenizer = PinyinTokenizer::new(ReadingTable::parse(RETROFLEX).unwrap());
        let pattern = ch.to_string();
        let text = ch.to_string();
        let exact = MatchOptions::default().with_fuzzy(false).with_initials(initials);
        let fuzzy = exact.with_fuzzy(true);
        prop_assert_eq!(
            is_match(&pattern, &text, &tokenizer, &exact).unwrap(),
            is_match(&pattern, &text, &tokenizer, &fuzzy).unwrap()
        );
    }
}

#[test]
fn tokenizer_output_always_carries_literal() {
    let tokenizer = PinyinTokenizer::new(ReadingTable::parse(RETROFLEX).unwrap());
    let tokens = tokenizer
        .tokenize("中车是音x", &TokenizeOptions::default())
        .unwrap();
    for token in &tokens {
        assert!(token.has_spelling(token.original()));
    }
}
