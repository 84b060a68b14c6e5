// src/protocol/rules.rs

use crate::config::Language;
use crate::memory::Verbalizer;
use crate::protocol::{Action, ParamValue, Parameters, Plan, Resolution, RiskLevel, Step};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

const NOTE_TITLE_CHARS: usize = 20;
const GENERIC_MEDIA: [&str; 8] = [
    "music", "some music", "a song", "songs", "something", "音乐", "歌曲", "歌",
];

/// Keyword tables for the rule-based planner. Every entry is a regex
/// fragment, matched case-insensitively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub destructive: Vec<String>,
    pub connectives: Vec<String>,
    pub separators: Vec<String>,
    pub conjunctions: Vec<String>,
    pub command_verbs: Vec<String>,
    pub min_clause_words: usize,
    pub min_clause_cjk: usize,
    pub setting: Vec<String>,
    pub media: Vec<String>,
    pub search: Vec<String>,
    pub note: Vec<String>,
    pub launch: Vec<String>,
    pub play_verbs: Vec<String>,
    pub search_verbs: Vec<String>,
    pub note_verbs: Vec<String>,
    pub launch_verbs: Vec<String>,
    pub known_apps: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            destructive: strings(&[
                r"删除|\bdelete\b|\bremove\b|\berase\b",
                r"清空|清除|\bclear\b|\bclean\b|\bwipe\b",
                r"格式化|\bformat\b",
                r"关闭.*网络|断网|\bdisconnect\b",
                r"重启|关机|\bshut\s*down\b|\brestart\b|\breboot\b",
                r"卸载|\buninstall\b",
            ]),
            connectives: strings(&[
                r"\band then\b",
                r"\bafter that\b",
                r"\bafterwards\b",
                r"\bthen\b",
                "然后",
                "接着",
                "之后",
                "随后",
                "并且",
            ]),
            separators: strings(&[",", "，", ";", "；"]),
            conjunctions: strings(&[r"\band\b", "和", "并"]),
            command_verbs: strings(&[
                r"\bset\b",
                r"\bturn\b",
                r"\bmute\b",
                r"\bplay\b",
                r"\bpause\b",
                r"\bskip\b",
                r"\bsearch\b",
                r"\bgoogle\b",
                r"\blook\s+up\b",
                r"\bopen\b",
                r"\blaunch\b",
                r"\bstart\b",
                r"\btake\s+a\s+note\b",
                r"\bmake\s+a\s+note\b",
                r"\bwrite\s+down\b",
                r"\bnote\b",
                "把",
                "调",
                "静音",
                "播放",
                "暂停",
                "搜索",
                "查找",
                "查一下",
                "打开",
                "启动",
                "记录",
                "记下",
                "写下",
            ]),
            min_clause_words: 2,
            min_clause_cjk: 4,
            setting: strings(&[
                r"音量|声音|\bvolume\b",
                r"亮度|\bbrightness\b",
                r"静音|\bmute\b",
            ]),
            media: strings(&[
                r"播放|暂停|\bplay\b|\bpause\b|\bresume\b",
                r"音乐|歌曲|\bmusic\b|\bsong\b",
                r"下一首|上一首|\bnext (?:track|song)\b|\bprevious (?:track|song)\b|\bskip\b",
            ]),
            search: strings(&[r"搜索|查找|查一下|找一下|百度|\bsearch\b|\bgoogle\b|\blook up\b"]),
            note: strings(&[
                r"记录|笔记|备忘|记下|写下",
                r"\bnote\b|\bmemo\b|\bwrite down\b",
            ]),
            launch: strings(&[r"打开|启动|\bopen\b|\blaunch\b|\bstart\b"]),
            play_verbs: strings(&[r"\bplay\b", "播放"]),
            search_verbs: strings(&[
                r"\bsearch\s+for\b",
                r"\bsearch\b",
                r"\bgoogle\b",
                r"\blook\s+up\b",
                "搜索一下",
                "搜索",
                "查找",
                "查一下",
                "找一下",
                "百度",
            ]),
            note_verbs: strings(&[
                r"\btake\s+a\s+note\b",
                r"\bmake\s+a\s+note\b",
                r"\bwrite\s+down\b",
                r"\bnote\b",
                r"\bmemo\b",
                "记录一下",
                "记录",
                "笔记",
                "备忘",
                "记下",
                "写下",
            ]),
            launch_verbs: strings(&[r"\bopen\b", r"\blaunch\b", r"\bstart\b", "打开", "启动"]),
            known_apps: strings(&[
                "Safari", "Chrome", "Firefox", "WeChat", "微信", "Music", "Notes", "Terminal",
                "Finder", "Mail", "Calendar", "Slack", "Spotify", "音乐",
            ]),
        }
    }
}

fn build(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn alternation(fragments: &[String]) -> String {
    fragments.join("|")
}

/// `<verb> <rest>`, capturing the rest.
fn verb_capture(verbs: &[String]) -> Result<Regex, regex::Error> {
    build(&format!(r"(?:{})\s*[:：]?\s*(.+)", alternation(verbs)))
}

fn known_app_pattern(apps: &[String]) -> String {
    apps.iter()
        .map(|app| {
            if app.is_ascii() {
                format!(r"\b{}\b", regex::escape(app))
            } else {
                regex::escape(app)
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Deterministic keyword planner. Total: the worst case is a clarification
/// step, never an error.
#[derive(Clone, Debug)]
pub struct RulePlanner {
    destructive: Vec<Regex>,
    connectives: Regex,
    separators: Regex,
    conjunctions: Regex,
    command_start: Regex,
    min_clause_words: usize,
    min_clause_cjk: usize,
    groups: Vec<(Action, Vec<Regex>)>,
    percent: Regex,
    setting_number: Regex,
    brightness: Regex,
    mute: Regex,
    pause: Regex,
    next: Regex,
    previous: Regex,
    play_query: Regex,
    search_query: Regex,
    note_body: Regex,
    launch_target: Regex,
    leading_launch: Regex,
    known_apps: Option<Regex>,
    app_suffix: Regex,
    verbalizer: Verbalizer,
}

impl RulePlanner {
    pub fn new(rules: &RuleSet, language: Language) -> Result<Self, regex::Error> {
        let compile_all = |patterns: &[String]| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| build(p)).collect()
        };

        let known_apps = if rules.known_apps.is_empty() {
            None
        } else {
            Some(build(&known_app_pattern(&rules.known_apps))?)
        };

        let mut launch = compile_all(&rules.launch)?;
        if let Some(apps) = &known_apps {
            launch.push(apps.clone());
        }

        // Priority order: the first group whose extraction succeeds wins.
        let groups = vec![
            (Action::AdjustSetting, compile_all(&rules.setting)?),
            (Action::PlayMedia, compile_all(&rules.media)?),
            (Action::WebSearch, compile_all(&rules.search)?),
            (Action::CreateNote, compile_all(&rules.note)?),
            (Action::LaunchApp, launch),
        ];

        let separators = rules
            .separators
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>();

        Ok(Self {
            destructive: compile_all(&rules.destructive)?,
            connectives: build(&alternation(&rules.connectives))?,
            separators: build(&separators.join("|"))?,
            conjunctions: build(&alternation(&rules.conjunctions))?,
            command_start: build(&format!("^(?:{})", alternation(&rules.command_verbs)))?,
            min_clause_words: rules.min_clause_words,
            min_clause_cjk: rules.min_clause_cjk,
            groups,
            percent: build(r"(\d+(?:\.\d+)?)\s*(?:%|％|percent\b)")?,
            setting_number: build(r"(?:volume|brightness|音量|声音|亮度)\D*?(\d+(?:\.\d+)?)")?,
            brightness: build(r"亮度|\bbrightness\b")?,
            mute: build(r"静音|\bmute\b")?,
            pause: build(r"暂停|\bpause\b")?,
            next: build(r"下一首|\bnext\b|\bskip\b")?,
            previous: build(r"上一首|\bprevious\b|\bprev\b")?,
            play_query: verb_capture(&rules.play_verbs)?,
            search_query: verb_capture(&rules.search_verbs)?,
            note_body: verb_capture(&rules.note_verbs)?,
            launch_target: build(&format!(
                r"(?:{})\s*(?:the\s+)?(.+)",
                alternation(&rules.launch_verbs)
            ))?,
            leading_launch: build(&format!(
                r"^(?:{})\s*(?:the\s+)?(.+)",
                alternation(&rules.launch_verbs)
            ))?,
            known_apps,
            app_suffix: build(r"\s*(?:\bapp\b|\bapplication\b|应用程序|应用|程序)$")?,
            verbalizer: Verbalizer::new(language),
        })
    }

    pub fn is_destructive(&self, text: &str) -> bool {
        self.destructive.iter().any(|re| re.is_match(text))
    }

    /// Resolve an utterance into a single step, or a plan when it contains
    /// several clauses.
    pub fn resolve(&self, text: &str) -> Resolution {
        let text = text.trim();
        let clauses = self.split_clauses(text);

        if clauses.len() < 2 {
            return Resolution::Step(self.resolve_clause(text));
        }

        debug!(clauses = clauses.len(), "multi-step utterance");
        let steps = clauses.iter().map(|clause| self.resolve_clause(clause)).collect();
        Resolution::Plan(Plan::new(steps, text))
    }

    /// Split on sequencing words first; fall back to separators only when
    /// every resulting clause is long enough to stand alone. Each clause is
    /// then split on conjunctions joining two commands.
    pub fn split_clauses(&self, text: &str) -> Vec<String> {
        self.split_sequence(text)
            .into_iter()
            .flat_map(|clause| self.split_conjunctions(&clause))
            .collect()
    }

    fn split_sequence(&self, text: &str) -> Vec<String> {
        let by_marker = self
            .connectives
            .split(text)
            .map(clean_clause)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        if by_marker.len() >= 2 {
            return by_marker;
        }

        let by_separator = self
            .separators
            .split(text)
            .map(clean_clause)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        if by_separator.len() >= 2 && by_separator.iter().all(|c| self.long_enough(c)) {
            return by_separator;
        }

        vec![text.to_string()]
    }

    /// "open Safari and search for rust" splits; "search for salt and
    /// pepper" does not, since "pepper" is not a command.
    fn split_conjunctions(&self, clause: &str) -> Vec<String> {
        let parts = self
            .conjunctions
            .split(clause)
            .map(clean_clause)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();
        let all_commands = parts
            .iter()
            .all(|part| self.long_enough(part) && self.command_start.is_match(part));

        if parts.len() >= 2 && all_commands {
            parts
        } else {
            vec![clause.to_string()]
        }
    }

    fn long_enough(&self, clause: &str) -> bool {
        let words = clause.split_whitespace().count();
        let cjk = clause.chars().filter(|c| is_cjk(*c)).count();
        words >= self.min_clause_words || cjk >= self.min_clause_cjk
    }

    /// Single-step path.
    pub fn resolve_clause(&self, clause: &str) -> Step {
        let clause = clean_clause(clause);

        if self.is_destructive(&clause) {
            return Step::clarification(
                self.verbalizer.dangerous(&clause),
                RiskLevel::High,
                "Dangerous operation detected",
            );
        }

        // "open Music" names an app, not something to play.
        if self.names_known_app(&clause) {
            if let Some(step) = self.build_step(Action::LaunchApp, &clause) {
                return step;
            }
        }

        for (action, patterns) in &self.groups {
            if !patterns.iter().any(|re| re.is_match(&clause)) {
                continue;
            }
            if let Some(step) = self.build_step(*action, &clause) {
                return step;
            }
        }

        Step::clarification(
            self.verbalizer.not_understood(),
            RiskLevel::Medium,
            "No matching intent",
        )
    }

    fn build_step(&self, action: Action, clause: &str) -> Option<Step> {
        let parameters = self.extract(action, clause)?;
        let mut step = Step::new(action, parameters, String::new());
        step.spoken_response = self.verbalizer.describe(&step);
        Some(step)
    }

    /// A launch verb leads the clause and its whole object is a known app.
    fn names_known_app(&self, clause: &str) -> bool {
        let (Some(apps), Some(target)) = (&self.known_apps, capture(&self.leading_launch, clause))
        else {
            return false;
        };
        let target = self.app_suffix.replace(&target, "");
        let target = target.trim();
        apps.find(target)
            .is_some_and(|m| m.start() == 0 && m.end() == target.len())
    }

    fn extract(&self, action: Action, text: &str) -> Option<Parameters> {
        match action {
            Action::AdjustSetting => self.extract_setting(text),
            Action::PlayMedia => Some(self.extract_media(text)),
            Action::WebSearch => Some(self.extract_search(text)),
            Action::CreateNote => Some(self.extract_note(text)),
            Action::LaunchApp => self.extract_launch(text),
            Action::RequestClarification => None,
        }
    }

    fn extract_setting(&self, text: &str) -> Option<Parameters> {
        let setting = if self.brightness.is_match(text) {
            "brightness"
        } else {
            "volume"
        };

        let number = self
            .percent
            .captures(text)
            .or_else(|| self.setting_number.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_number(m.as_str()));

        let value = match number {
            Some(value) => value,
            None if setting == "volume" && self.mute.is_match(text) => ParamValue::Int(0),
            None => return None,
        };

        let mut params = Parameters::new();
        params.insert("setting".into(), setting.into());
        params.insert("value".into(), value);
        Some(params)
    }

    fn extract_media(&self, text: &str) -> Parameters {
        let action = if self.pause.is_match(text) {
            "pause"
        } else if self.previous.is_match(text) {
            "previous"
        } else if self.next.is_match(text) {
            "next"
        } else {
            "play"
        };

        let mut params = Parameters::new();
        params.insert("action".into(), action.into());

        if action == "play" {
            let query = capture(&self.play_query, text)
                .filter(|q| !GENERIC_MEDIA.contains(&q.to_lowercase().as_str()));
            if let Some(query) = query {
                params.insert("query".into(), query.into());
            }
        }
        params
    }

    fn extract_search(&self, text: &str) -> Parameters {
        let query = capture(&self.search_query, text).unwrap_or_else(|| text.to_string());
        let mut params = Parameters::new();
        params.insert("query".into(), query.into());
        params
    }

    fn extract_note(&self, text: &str) -> Parameters {
        let (title, body) = match capture(&self.note_body, text) {
            Some(content) => (content.chars().take(NOTE_TITLE_CHARS).collect(), content),
            None => ("Quick Note".to_string(), text.to_string()),
        };
        let mut params = Parameters::new();
        params.insert("title".into(), title.into());
        params.insert("body".into(), body.into());
        params
    }

    fn extract_launch(&self, text: &str) -> Option<Parameters> {
        let app = capture(&self.launch_target, text)
            .map(|target| self.app_suffix.replace(&target, "").trim().to_string())
            .filter(|app| !app.is_empty())
            .or_else(|| {
                self.known_apps
                    .as_ref()
                    .and_then(|re| re.find(text))
                    .map(|m| m.as_str().to_string())
            })?;

        let mut params = Parameters::new();
        params.insert("app".into(), app.into());
        Some(params)
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_clause(m.as_str()))
        .filter(|s| !s.is_empty())
}

fn parse_number(raw: &str) -> Option<ParamValue> {
    if raw.contains('.') {
        raw.parse::<f64>().ok().map(ParamValue::Float)
    } else {
        raw.parse::<i64>().ok().map(ParamValue::Int)
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Trim whitespace, punctuation and leading filler words.
fn clean_clause(raw: &str) -> String {
    const PUNCT: &[char] = &[',', '，', ';', '；', '、', '.', '。', '!', '！', '?', '？'];

    let mut clause = raw.trim().trim_matches(|c: char| PUNCT.contains(&c) || c.is_whitespace());
    for filler in ["and ", "And ", "和", "再"] {
        if let Some(rest) = clause.strip_prefix(filler) {
            clause = rest.trim_start();
        }
    }
    clause.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> RulePlanner {
        RulePlanner::new(&RuleSet::default(), Language::En).unwrap()
    }

    fn single(text: &str) -> Step {
        match planner().resolve(text) {
            Resolution::Step(step) => step,
            Resolution::Plan(plan) => panic!("expected a single step, got {plan:?}"),
        }
    }

    #[test]
    fn test_set_volume() {
        let step = single("set volume to 30%");
        assert_eq!(step.action, Action::AdjustSetting);
        assert_eq!(step.text_param("setting"), Some("volume"));
        assert_eq!(step.param("value"), Some(&ParamValue::Int(30)));
        assert!(!step.needs_confirmation);
        assert_eq!(step.spoken_response, "Setting volume to 30%");
    }

    #[test]
    fn test_chinese_volume() {
        let step = single("把音量调到50%");
        assert_eq!(step.action, Action::AdjustSetting);
        assert_eq!(step.param("value"), Some(&ParamValue::Int(50)));
    }

    #[test]
    fn test_volume_without_percent_sign() {
        let step = single("turn the volume to 45");
        assert_eq!(step.param("value"), Some(&ParamValue::Int(45)));
    }

    #[test]
    fn test_mute() {
        let step = single("mute");
        assert_eq!(step.action, Action::AdjustSetting);
        assert_eq!(step.param("value"), Some(&ParamValue::Int(0)));
    }

    #[test]
    fn test_volume_without_value_needs_clarification() {
        let step = single("volume");
        assert_eq!(step.action, Action::RequestClarification);
        assert_eq!(step.risk.level, RiskLevel::Medium);
    }

    #[test]
    fn test_open_then_search_is_plan() {
        let resolution = planner().resolve("open Safari then search for Python tutorials");
        let plan = resolution.as_plan().expect("plan");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.summary, "open Safari then search for Python tutorials");
        assert_eq!(plan.steps[0].action, Action::LaunchApp);
        assert_eq!(plan.steps[0].text_param("app"), Some("Safari"));
        assert_eq!(plan.steps[1].action, Action::WebSearch);
        assert_eq!(plan.steps[1].text_param("query"), Some("Python tutorials"));
    }

    #[test]
    fn test_delete_forces_clarification() {
        let step = single("delete all files");
        assert_eq!(step.action, Action::RequestClarification);
        assert_eq!(step.risk.level, RiskLevel::High);
        assert!(step.needs_confirmation);
    }

    #[test]
    fn test_destructive_beats_launch() {
        let step = single("open Finder and remove my downloads");
        assert_eq!(step.action, Action::RequestClarification);
        assert_eq!(step.risk.level, RiskLevel::High);
    }

    #[test]
    fn test_unmatched_text_is_medium_clarification() {
        let step = single("what a lovely day");
        assert_eq!(step.action, Action::RequestClarification);
        assert_eq!(step.risk.level, RiskLevel::Medium);
        assert!(step.needs_confirmation);
    }

    #[test]
    fn test_media_actions() {
        assert_eq!(single("pause the music").text_param("action"), Some("pause"));
        assert_eq!(single("skip to the next track").text_param("action"), Some("next"));
        let play = single("play Bohemian Rhapsody");
        assert_eq!(play.text_param("action"), Some("play"));
        assert_eq!(play.text_param("query"), Some("Bohemian Rhapsody"));
        assert_eq!(single("play music").text_param("query"), None);
    }

    #[test]
    fn test_note_extraction() {
        let step = single("take a note: buy milk and eggs for the weekend");
        assert_eq!(step.action, Action::CreateNote);
        assert_eq!(step.text_param("body"), Some("buy milk and eggs for the weekend"));
        assert_eq!(step.text_param("title"), Some("buy milk and eggs fo"));
    }

    #[test]
    fn test_chinese_note() {
        let step = single("记录明天开会");
        assert_eq!(step.action, Action::CreateNote);
        assert_eq!(step.text_param("body"), Some("明天开会"));
    }

    #[test]
    fn test_launch_strips_app_suffix() {
        let step = single("open the Slack app");
        assert_eq!(step.action, Action::LaunchApp);
        assert_eq!(step.text_param("app"), Some("Slack"));
    }

    #[test]
    fn test_launch_by_known_app_name() {
        let step = single("chrome please");
        assert_eq!(step.action, Action::LaunchApp);
        assert_eq!(step.text_param("app"), Some("chrome"));
    }

    #[test]
    fn test_open_notes_is_launch_not_note() {
        assert_eq!(single("open Notes").action, Action::LaunchApp);
    }

    #[test]
    fn test_open_music_launches_the_app() {
        for text in ["open Music", "open the Music app", "launch Music"] {
            let step = single(text);
            assert_eq!(step.action, Action::LaunchApp, "{text}");
            assert_eq!(step.text_param("app"), Some("Music"), "{text}");
        }
        let step = single("打开音乐");
        assert_eq!(step.action, Action::LaunchApp);
        assert_eq!(step.text_param("app"), Some("音乐"));
    }

    #[test]
    fn test_music_without_launch_verb_still_plays() {
        assert_eq!(single("play music").action, Action::PlayMedia);
        assert_eq!(single("播放音乐").action, Action::PlayMedia);
    }

    #[test]
    fn test_and_joins_two_commands() {
        let plan = planner().resolve("open Safari and search for Python tutorials");
        let plan = plan.as_plan().expect("plan");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].action, Action::LaunchApp);
        assert_eq!(plan.steps[0].text_param("app"), Some("Safari"));
        assert_eq!(plan.steps[1].text_param("query"), Some("Python tutorials"));

        let plan = planner().resolve("打开微信和搜索天气");
        assert_eq!(plan.steps().len(), 2);
    }

    #[test]
    fn test_and_inside_an_argument_is_kept() {
        let step = single("search for salt and pepper");
        assert_eq!(step.action, Action::WebSearch);
        assert_eq!(step.text_param("query"), Some("salt and pepper"));
        assert!(!planner().resolve("搜索苹果和香蕉").is_plan());
    }

    #[test]
    fn test_and_split_inside_sequence() {
        let plan = planner().resolve("open Safari and search for rust then set volume to 10%");
        let actions: Vec<_> = plan.steps().iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![Action::LaunchApp, Action::WebSearch, Action::AdjustSetting]
        );
    }

    #[test]
    fn test_chinese_plan() {
        let plan = planner().resolve("打开微信然后搜索天气");
        let plan = plan.as_plan().expect("plan");
        assert_eq!(plan.steps[0].text_param("app"), Some("微信"));
        assert_eq!(plan.steps[1].text_param("query"), Some("天气"));
    }

    #[test]
    fn test_comma_split_needs_long_clauses() {
        let plan = planner().resolve("set volume to 20%, open Safari");
        assert_eq!(plan.steps().len(), 2);

        let single = planner().resolve("search for apples, pears");
        assert!(!single.is_plan());
        assert_eq!(single.steps()[0].text_param("query"), Some("apples, pears"));
    }

    #[test]
    fn test_word_boundary_on_connectives() {
        assert!(!planner().resolve("search for Athens history").is_plan());
    }

    #[test]
    fn test_destructive_clause_inside_plan() {
        let plan = planner().resolve("open Finder then delete everything");
        let plan = plan.as_plan().unwrap();
        assert_eq!(plan.steps[0].action, Action::LaunchApp);
        assert_eq!(plan.steps[1].action, Action::RequestClarification);
        assert_eq!(plan.steps[1].risk.level, RiskLevel::High);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let planner = planner();
        let text = "open Safari then search for Python tutorials";
        assert_eq!(planner.resolve(text), planner.resolve(text));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(single("   ").action, Action::RequestClarification);
    }
}
