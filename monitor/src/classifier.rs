//! Rule-based emotion classification for assistant replies.
//!
//! Assistant replies are short conversational Japanese with the occasional
//! long technical explanation. The classifier scores each [`Emotion`] from
//! several independent signals and picks the highest score:
//!
//! - keyword hits anywhere in the text
//! - sentence-final patterns covering polite, plain, masculine and
//!   feminine speech registers
//! - extra weight for keywords in the opening 50 characters
//! - structural heuristics (code, paths, technical nouns, questions,
//!   resolved-problem narratives)
//!
//! followed by dampening passes that keep weak or merely tonal signals from
//! overriding an otherwise neutral explanation. Ties resolve in
//! [`Emotion::ALL`] order, so `Neutral` wins every tie.
//!
//! # Example
//!
//! ```
//! use chatter_monitor::classifier::EmotionClassifier;
//! use chatter_monitor::types::Emotion;
//!
//! let classifier = EmotionClassifier::new();
//! assert_eq!(classifier.classify("バグを修正できました！"), Emotion::Happy);
//! assert_eq!(classifier.classify(""), Emotion::Neutral);
//! ```

use regex::Regex;
use tracing::trace;

use crate::types::Emotion;

/// Texts longer than this many characters are weighted as long text.
const LONG_TEXT_CHARS: usize = 100;

/// Number of leading characters that receive extra keyword weight.
const LEAD_CHARS: usize = 50;

/// Texts shorter than this may be read as a bare acknowledgment.
const SHORT_REPLY_CHARS: usize = 10;

const KEYWORD_WEIGHT: i32 = 2;
const KEYWORD_WEIGHT_LONG: i32 = 3;
const PATTERN_WEIGHT: i32 = 2;
const PATTERN_WEIGHT_LONG: i32 = 4;
const LEAD_WEIGHT: i32 = 2;

/// Combined affect score at which long text stops defaulting to neutral.
const LONG_TEXT_AFFECT_THRESHOLD: i32 = 10;
const LONG_TEXT_NEUTRAL_PENALTY: i32 = 3;

/// `Relaxed` scores below this are folded into `Neutral`.
const WEAK_RELAXED_LIMIT: i32 = 6;
/// `Sad` scores below this are folded into `Neutral` when neutral is strong.
const WEAK_SAD_LIMIT: i32 = 4;
const STRONG_NEUTRAL: i32 = 4;

const HAPPY_KEYWORDS: &[&str] = &[
    "うれしい", "嬉しい", "うれ", "喜", "喜び",
    "よかった", "よかっ", "良かっ", "良い",
    "やった", "やっ", "できた",
    "すごい", "すご", "凄", "素晴らしい", "素敵",
    "ありがと", "ありが", "感謝", "サンクス",
    "楽しい", "楽し", "愉快", "面白い", "面白",
    "成功", "完璧", "完了", "クリア",
    "最高", "ベスト", "グッド", "ナイス", "いいね",
    "助かっ", "助かる",
    "わーい", "やっほー", "やったー", "いえーい",
    "達成", "ゲット", "獲得", "実現",
    "解決", "修正できた", "直った",
    "満足", "幸せ", "ハッピー", "ラッキー", "運が良",
    "期待以上", "想像以上",
];

const ANGRY_KEYWORDS: &[&str] = &[
    "むかつく", "むかつ", "ムカつ", "腹立",
    "怒", "イライラ", "いらいら", "キレ",
    "最悪", "ひどい", "酷", "クソ", "くそ",
    "うざい", "ウザ", "うっとうし",
    "許せない", "許せ", "我慢できない",
    "ダメ", "駄目", "ダメだ", "だめ",
    "エラー", "バグ", "失敗", "動かない", "壊れ",
    "問題", "トラブル", "不具合", "障害",
    "困る", "困っ", "困った",
    "信じられない", "呆れ", "ふざけ", "冗談じゃ",
    "勘弁", "マジで", "本気で腹",
];

const SAD_KEYWORDS: &[&str] = &[
    "悲しい", "悲し", "哀",
    "残念", "ざんねん", "惜しい",
    "つらい", "辛い", "つら", "苦しい",
    "ごめん", "すまな", "すみま", "申し訳", "謝",
    "無理", "不可能",
    "困った", "困難",
    "諦め", "あきら", "断念",
    "失敗し", "しくじ", "ミス", "駄目だった",
    "間に合わ", "遅れ",
    "自信ない", "不安", "心配", "怖",
    "しょんぼり", "がっかり", "落ち込",
    "泣", "涙",
];

const RELAXED_KEYWORDS: &[&str] = &[
    "落ち着", "落着", "冷静",
    "安心", "あんしん", "ホッと",
    "大丈夫", "だいじょうぶ", "だいじょぶ",
    "OK", "ok", "オッケー", "おk",
    "了解", "りょうかい", "承知",
    "問題ない", "問題なし", "ノープロブレム",
    "ゆっくり", "のんびり", "じっくり",
    "様子見",
];

const SURPRISED_KEYWORDS: &[&str] = &[
    "え！", "えっ", "え？", "えー",
    "まさか", "マジ", "まじ", "本当",
    "びっくり", "ビックリ", "驚", "ビビ",
    "意外", "予想外", "想定外",
    "なんと", "何と", "おお", "おぉ",
    "すごっ", "やば", "ヤバ",
    "信じられない", "嘘", "うそ", "ウソ",
    "本当に", "ほんと", "本気",
    "あり得ない", "ありえな",
    "初めて", "見たことない",
    "はぁ！？", "へぇ", "ほぉ", "ふぉ",
    "おったまげ", "たまげ",
];

const HAPPY_PATTERNS: &[&str] = &[
    r"[！!]{2,}",
    // feminine
    r"わ[ね〜～！!♪]+$",
    r"わよ[！!♪]+$",
    // polite / neutral
    r"です[！!♪]+$",
    r"ます[！!♪]+$",
    r"ました[！!♪]+$",
    r"ね[！!♪]+$",
    r"よ[！!♪]+$",
    // masculine
    r"ぜ[！!]+$",
    r"ぞ[！!]+$",
    r"だ[！!]+$",
    r"った[！!]+$",
    r"[♪♫]+",
    r"[✨🎉🎊😊😄👍]+",
];

const ANGRY_PATTERNS: &[&str] = &[
    r"[！!？?]{2,}",
    r"わよ[！!]{2,}$",
    r"のよ[！!]+$",
    r"です[！!]{2,}$",
    r"ません[！!]+$",
    r"だ[！!]{2,}$",
    r"だろ[！!？?]+$",
    r"のか[！!？?]+$",
    r"[💢😠😡]+",
];

const SAD_PATTERNS: &[&str] = &[
    r"わ[。.…]+$",
    r"のね[。.…]+$",
    r"です[。.…]+$",
    r"ます[。.…]+$",
    r"ません[。.…]+$",
    r"だ[。.…]+$",
    r"な[。.…]+$",
    r"[。.]{2,}$",
    r"…+$",
    r"[😢😭💔]+",
];

const RELAXED_PATTERNS: &[&str] = &[
    r"わ[ね〜～]+$",
    r"ですわ[〜～]+$",
    r"です[〜～]+$",
    r"ます[〜～]+$",
    r"ました[〜～]+$",
    r"ね[〜～]+$",
    r"OK[。.〜～]+$",
    r"了解[。.〜～]+$",
];

const SURPRISED_PATTERNS: &[&str] = &[
    r"[！!？?]$",
    r"え[っ〜～！!？?]+",
    r"まさか[！!？?]",
    r"の[！!？?]$",
    r"ですか[！!？?]$",
    r"ますか[！!？?]$",
    r"のか[！!？?]$",
    r"だと[！!？?]$",
    r"マジ[！!？?]",
    r"ほんと[！!？?]",
    r"本当[！!？?]",
    r"[😮😲🤯]+",
];

const ACKNOWLEDGMENT_PREFIXES: &[&str] = &["OK", "了解", "わかった"];

const PROGRAMMING_KEYWORDS: &[&str] = &[
    "import", "export", "function", "const", "let", "var", "class", "interface", "type",
];

const TECHNICAL_NOUNS: &[&str] = &[
    "コード", "関数", "メソッド", "変数", "クラス", "インターフェース", "型", "配列",
    "オブジェクト", "プロパティ",
];

const EXPLANATORY_CONNECTIVES: &[&str] = &[
    "次に", "まず", "それから", "その後", "最後に", "ここで", "この", "その",
];

const PROBLEM_WORDS: &[&str] = &["エラー", "バグ", "問題", "失敗"];

const RESOLUTION_WORDS: &[&str] = &["修正", "解決", "できた", "成功", "完了"];

/// Keyword and pattern tables for one emotion.
#[derive(Debug)]
struct Lexicon {
    emotion: Emotion,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
}

/// Per-emotion scores for a single classification call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Scores([i32; 6]);

impl Scores {
    fn get(&self, emotion: Emotion) -> i32 {
        self.0[emotion.index()]
    }

    fn add(&mut self, emotion: Emotion, amount: i32) {
        self.0[emotion.index()] += amount;
    }

    fn set(&mut self, emotion: Emotion, value: i32) {
        self.0[emotion.index()] = value;
    }

    /// Subtracts `amount`, flooring at zero.
    fn reduce(&mut self, emotion: Emotion, amount: i32) {
        let slot = &mut self.0[emotion.index()];
        *slot = (*slot - amount).max(0);
    }

    /// Moves the whole score of `from` into `Neutral`.
    fn fold_into_neutral(&mut self, from: Emotion) {
        let moved = self.get(from);
        self.add(Emotion::Neutral, moved);
        self.set(from, 0);
    }

    fn affect_sum(&self) -> i32 {
        Emotion::AFFECTIVE.iter().map(|e| self.get(*e)).sum()
    }

    /// Highest score, keeping the earliest label on ties.
    fn winner(&self) -> Emotion {
        let mut best = Emotion::Neutral;
        let mut best_score = 0;
        for emotion in Emotion::ALL {
            let score = self.get(emotion);
            if score > best_score {
                best_score = score;
                best = emotion;
            }
        }
        best
    }
}

/// Deterministic, stateless emotion classifier.
///
/// Pattern tables are compiled once in [`EmotionClassifier::new`]; calls to
/// [`classify`](EmotionClassifier::classify) share nothing but those tables.
#[derive(Debug)]
pub struct EmotionClassifier {
    lexicons: Vec<Lexicon>,
    code_marker: Regex,
    path_like: Regex,
}

impl Default for EmotionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionClassifier {
    /// Builds the classifier, compiling every sentence-final pattern.
    #[must_use]
    pub fn new() -> Self {
        let table: [(Emotion, &'static [&'static str], &[&str]); 5] = [
            (Emotion::Happy, HAPPY_KEYWORDS, HAPPY_PATTERNS),
            (Emotion::Angry, ANGRY_KEYWORDS, ANGRY_PATTERNS),
            (Emotion::Sad, SAD_KEYWORDS, SAD_PATTERNS),
            (Emotion::Relaxed, RELAXED_KEYWORDS, RELAXED_PATTERNS),
            (Emotion::Surprised, SURPRISED_KEYWORDS, SURPRISED_PATTERNS),
        ];

        let lexicons = table
            .into_iter()
            .map(|(emotion, keywords, patterns)| Lexicon {
                emotion,
                keywords,
                patterns: patterns.iter().map(|p| compile(p)).collect(),
            })
            .collect();

        Self {
            lexicons,
            code_marker: compile(r"```|`[^`]+`"),
            path_like: compile(r"[/\\][a-zA-Z0-9_\-./\\]+"),
        }
    }

    /// Classifies `text`, returning [`Emotion::Neutral`] when no signal wins.
    ///
    /// Total over every string input; never panics.
    #[must_use]
    pub fn classify(&self, text: &str) -> Emotion {
        let text = text.trim();
        let length = text.chars().count();
        if length < 2 {
            return Emotion::Neutral;
        }

        let is_long = length > LONG_TEXT_CHARS;
        let keyword_weight = if is_long { KEYWORD_WEIGHT_LONG } else { KEYWORD_WEIGHT };
        let pattern_weight = if is_long { PATTERN_WEIGHT_LONG } else { PATTERN_WEIGHT };

        let mut scores = Scores::default();
        let mut happy_pattern_hit = false;

        for lexicon in &self.lexicons {
            for keyword in lexicon.keywords {
                if text.contains(keyword) {
                    scores.add(lexicon.emotion, keyword_weight);
                }
            }
        }

        for lexicon in &self.lexicons {
            for pattern in &lexicon.patterns {
                if pattern.is_match(text) {
                    scores.add(lexicon.emotion, pattern_weight);
                    if lexicon.emotion == Emotion::Happy {
                        happy_pattern_hit = true;
                    }
                }
            }
        }

        let lead = leading_chars(text, LEAD_CHARS);
        for lexicon in &self.lexicons {
            for keyword in lexicon.keywords {
                if lead.contains(keyword) {
                    scores.add(lexicon.emotion, LEAD_WEIGHT);
                }
            }
        }

        self.apply_heuristics(text, length, &mut scores);

        // Negative affect suppresses a merely tonal happy ending.
        if (scores.get(Emotion::Angry) > 0 || scores.get(Emotion::Sad) > 0) && happy_pattern_hit {
            scores.set(Emotion::Happy, scores.get(Emotion::Happy) / 2);
        }

        if is_long && scores.affect_sum() >= LONG_TEXT_AFFECT_THRESHOLD {
            scores.reduce(Emotion::Neutral, LONG_TEXT_NEUTRAL_PENALTY);
        }

        let relaxed = scores.get(Emotion::Relaxed);
        if relaxed > 0 && relaxed < WEAK_RELAXED_LIMIT {
            scores.fold_into_neutral(Emotion::Relaxed);
        }

        let sad = scores.get(Emotion::Sad);
        if scores.get(Emotion::Neutral) >= STRONG_NEUTRAL && sad > 0 && sad < WEAK_SAD_LIMIT {
            scores.fold_into_neutral(Emotion::Sad);
        }

        let winner = scores.winner();
        if winner != Emotion::Neutral {
            trace!(
                text = %lead,
                scores = ?scores.0,
                result = %winner,
                "Classified emotion"
            );
        }
        winner
    }

    fn apply_heuristics(&self, text: &str, length: usize, scores: &mut Scores) {
        let has_emotion = scores.affect_sum() > 0;
        let neutral_boost = |none: i32, some: i32| if has_emotion { some } else { none };

        if text.ends_with('?') || text.ends_with('？') {
            scores.add(Emotion::Surprised, 1);
        }

        if length < SHORT_REPLY_CHARS
            && ACKNOWLEDGMENT_PREFIXES.iter().any(|p| text.starts_with(p))
        {
            scores.add(Emotion::Relaxed, 2);
        }

        if self.code_marker.is_match(text) {
            scores.add(Emotion::Neutral, neutral_boost(4, 2));
            scores.reduce(Emotion::Relaxed, 2);
        }

        if contains_any(text, PROGRAMMING_KEYWORDS) {
            scores.add(Emotion::Neutral, neutral_boost(4, 2));
            scores.reduce(Emotion::Relaxed, 2);
        }

        if self.path_like.is_match(text) {
            scores.add(Emotion::Neutral, neutral_boost(1, 0));
        }

        if contains_any(text, TECHNICAL_NOUNS) {
            scores.add(Emotion::Neutral, neutral_boost(3, 1));
            scores.reduce(Emotion::Relaxed, 1);
        }

        if !has_emotion && contains_any(text, EXPLANATORY_CONNECTIVES) {
            scores.add(Emotion::Neutral, 1);
        }

        if length > LONG_TEXT_CHARS {
            let terminators = text.chars().filter(|c| matches!(c, '。' | '.')).count();
            if terminators >= 3 {
                scores.add(Emotion::Neutral, neutral_boost(2, 1));
            }
        }

        // A fixed problem reads as good news.
        if contains_any(text, PROBLEM_WORDS) && contains_any(text, RESOLUTION_WORDS) {
            scores.add(Emotion::Happy, 4);
            scores.reduce(Emotion::Angry, 2);
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn leading_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Emotion {
        EmotionClassifier::new().classify(text)
    }

    // Neutral: technical explanations

    #[test]
    fn code_example_with_import_is_neutral() {
        let text = "次のようにimportします。\n```rust\nuse std::fs;\n```\nこれでファイルを読めるようになります。";
        assert_eq!(classify(text), Emotion::Neutral);
    }

    #[test]
    fn class_and_interface_explanation_is_neutral() {
        let text = "このクラスはルールベースの感情分類を行います。インターフェースEmotionを実装しており、classify メソッドで感情を判定します。";
        assert_eq!(classify(text), Emotion::Neutral);
    }

    #[test]
    fn type_definition_is_neutral() {
        let text = r#"type Emotion = "neutral" | "happy" | "angry"と定義されています。"#;
        assert_eq!(classify(text), Emotion::Neutral);
    }

    #[test]
    fn long_step_by_step_explanation_is_neutral() {
        let text = "classifier.rsのclassifyメソッドは、以下の手順で感情を判定します。まず、キーワードマッチングを行います。次に、文末パターンをチェックします。その後、ヒューリスティックルールを適用します。最後に、最も高いスコアの感情を返します。このアルゴリズムにより、65-75%の精度を実現しています。";
        assert!(text.chars().count() > LONG_TEXT_CHARS);
        assert_eq!(classify(text), Emotion::Neutral);
    }

    #[test]
    fn code_block_explanation_is_neutral() {
        let text = "以下のように実装できます。\n```rust\nlet result = fetch_data().await;\n```\nこれでデータの取得と表示が完了します。";
        assert_eq!(classify(text), Emotion::Neutral);
    }

    #[test]
    fn plain_statements_are_neutral() {
        assert_eq!(classify("こんにちは"), Emotion::Neutral);
        assert_eq!(classify("ファイルを確認しました"), Emotion::Neutral);
        assert_eq!(classify("src/main.rsを確認してください"), Emotion::Neutral);
    }

    // Happy

    #[test]
    fn fixed_bug_is_happy() {
        assert_eq!(classify("バグを修正できました！"), Emotion::Happy);
        assert_eq!(
            classify("バグを修正できました！エラーが解決して正常に動作するようになりました。"),
            Emotion::Happy
        );
    }

    #[test]
    fn completion_report_is_happy() {
        assert_eq!(classify("実装が完了しました！テストも全て成功しています。"), Emotion::Happy);
    }

    #[test]
    fn resolved_problem_without_exclamation_is_happy() {
        let text = "問題を解決しました。型エラーを修正して、ビルドが成功するようになりました。";
        assert_eq!(classify(text), Emotion::Happy);
    }

    #[test]
    fn relief_is_happy() {
        assert_eq!(
            classify("そのライブラリを使うことで実装が簡単になって助かった！"),
            Emotion::Happy
        );
    }

    #[test]
    fn mixed_error_and_fix_prefers_happy() {
        assert_eq!(classify("エラーが発生しましたが、解決できました！"), Emotion::Happy);
        assert_eq!(
            classify("ESLintエラーを全て修正しました！ビルドが成功するようになりました！"),
            Emotion::Happy
        );
    }

    #[test]
    fn long_text_with_strong_affect_loses_neutral_default() {
        // Neutral and happy both score 6 before the long-text penalty.
        let text = "設定の読み込みは`load_config`関数にまとめ、定数は`const`で宣言する形に変えました。この変更で起動時の処理がわかりやすくなりました。変数名も見直して、型の指定を明示的に書くようにしました。全体の構成がすっきりして、あとから読む人にも意図が伝わるようになってよかったと思いませんか？";
        assert!(text.chars().count() > LONG_TEXT_CHARS);
        assert_eq!(classify(text), Emotion::Happy);
    }

    // Sad

    #[test]
    fn regret_halves_a_cheerful_ending() {
        // Happy keyword plus `です！` would outscore the regret alone.
        assert_eq!(classify("嬉しいけど残念です！"), Emotion::Sad);
    }

    #[test]
    fn apology_with_ellipsis_is_sad() {
        let text = "申し訳ありません…このエラーは現在のバージョンでは修正できません…";
        assert_eq!(classify(text), Emotion::Sad);
    }

    #[test]
    fn impossibility_is_sad() {
        assert_eq!(classify("その実装は無理です。現在の制約では対応できません..."), Emotion::Sad);
        assert_eq!(classify("残念です"), Emotion::Sad);
    }

    #[test]
    fn failed_test_with_apology_is_sad() {
        let text = "申し訳ありません。テストが失敗しました。型定義を修正する必要があります。";
        assert_eq!(classify(text), Emotion::Sad);
    }

    // Angry

    #[test]
    fn error_report_is_angry() {
        assert_eq!(classify("エラーが発生しました！型定義が間違っています。"), Emotion::Angry);
        assert_eq!(classify("これはバグです！この実装では正しく動作しません。"), Emotion::Angry);
        assert_eq!(classify("エラーです"), Emotion::Angry);
    }

    #[test]
    fn double_exclamation_trouble_is_angry() {
        assert_eq!(classify("トラブルが発生しました！！コンパイルエラーです。"), Emotion::Angry);
    }

    // Relaxed

    #[test]
    fn drawn_out_acknowledgment_is_relaxed() {
        assert_eq!(classify("了解しました〜"), Emotion::Relaxed);
        assert_eq!(classify("大丈夫だよ、問題ない。"), Emotion::Relaxed);
        assert_eq!(classify("OK"), Emotion::Relaxed);
    }

    #[test]
    fn weak_relaxed_folds_into_neutral() {
        assert_eq!(classify("OK〜、その方針で進めよう。"), Emotion::Neutral);
        assert_eq!(classify("このコードで安心"), Emotion::Neutral);
    }

    #[test]
    fn weak_sad_folds_into_strong_neutral() {
        assert_eq!(classify("`let x`を使います。"), Emotion::Neutral);
    }

    // Surprised

    #[test]
    fn surprise_expressions() {
        assert_eq!(classify("え！そんな実装方法があったんですか？"), Emotion::Surprised);
        assert_eq!(classify("まさか、このバグの原因がそこにあったとは！"), Emotion::Surprised);
        assert_eq!(
            classify("びっくりしました。このライブラリにそんな機能があるとは。"),
            Emotion::Surprised
        );
        assert_eq!(classify("マジ！？そのAPIがそんな動作をするの！？"), Emotion::Surprised);
    }

    #[test]
    fn unexpected_bug_is_surprised() {
        let text = "え？このメソッドにバグがあったんですね。予想外でした。";
        assert_eq!(classify(text), Emotion::Surprised);
    }

    #[test]
    fn questions_lean_surprised() {
        assert_eq!(classify("本当ですか？"), Emotion::Surprised);
        assert_eq!(classify("それで大丈夫ですか？"), Emotion::Surprised);
    }

    // Edge cases

    #[test]
    fn trivial_inputs_are_neutral() {
        assert_eq!(classify(""), Emotion::Neutral);
        assert_eq!(classify("   "), Emotion::Neutral);
        assert_eq!(classify("a"), Emotion::Neutral);
        assert_eq!(classify(" 嬉 "), Emotion::Neutral);
    }

    #[test]
    fn pathological_inputs_return_a_label() {
        let classifier = EmotionClassifier::new();
        let inputs = [
            "?".repeat(10_000),
            "あ".repeat(10_000),
            r".*+?()[]{}|^$\".to_string(),
            "`".repeat(999),
            "😡🎉😢🤯".repeat(50),
        ];
        for input in &inputs {
            let emotion = classifier.classify(input);
            assert!(Emotion::ALL.contains(&emotion));
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = EmotionClassifier::new();
        let text = "エラーが発生しましたが、解決できました！";
        let first = classifier.classify(text);
        for _ in 0..10 {
            assert_eq!(classifier.classify(text), first);
        }
        // Unrelated calls in between must not leak state.
        let _ = classifier.classify("申し訳ありません…");
        assert_eq!(classifier.classify(text), first);
    }

    #[test]
    fn ties_resolve_to_neutral_then_declaration_order() {
        let mut scores = Scores::default();
        assert_eq!(scores.winner(), Emotion::Neutral);

        scores.set(Emotion::Neutral, 3);
        scores.set(Emotion::Happy, 3);
        assert_eq!(scores.winner(), Emotion::Neutral);

        scores.set(Emotion::Sad, 4);
        scores.set(Emotion::Surprised, 4);
        assert_eq!(scores.winner(), Emotion::Sad);
    }

    #[test]
    fn reduce_floors_at_zero() {
        let mut scores = Scores::default();
        scores.set(Emotion::Relaxed, 1);
        scores.reduce(Emotion::Relaxed, 2);
        assert_eq!(scores.get(Emotion::Relaxed), 0);
    }

    #[test]
    fn leading_chars_respects_char_boundaries() {
        assert_eq!(leading_chars("あいう", 2), "あい");
        assert_eq!(leading_chars("ab", 50), "ab");
    }
}
