//! crates/math_mentor_core/src/document.rs
//!
//! Assembles generated recall questions into one LaTeX study sheet.
//! Pure and deterministic: the same questions always give the same bytes.

use crate::domain::{RecallQuestion, Topic};

/// File name offered for the downloaded sheet.
pub const RECALL_EXPORT_FILENAME: &str = "Active_Recall_Math2026.tex";

const PREAMBLE: &str = r"\documentclass[12pt,a4paper]{article}
\usepackage[utf8]{vietnam}
\usepackage{amsmath, amssymb, amsfonts}
\usepackage{geometry}
\geometry{a4paper, margin=1in}
\usepackage{xcolor}

\title{\textbf{TÀI LIỆU ÔN TẬP HỒI TƯỞNG (ACTIVE RECALL)\\KÌ THI THPTQG 2026}}
\author{Hệ thống MathMentor AI}
\date{\today}

\begin{document}
\maketitle

\section*{Lời giới thiệu}
Tài liệu này được tạo tự động dựa trên các lỗi sai bạn đã mắc phải. Hãy tự giải các câu hỏi này ra giấy mà không xem tài liệu để đạt hiệu quả ghi nhớ cao nhất.

";

const FOOTER: &str = "\n\\end{document}";

/// Groups questions by topic, keeping the order in which each topic first appears.
pub fn group_by_topic(questions: &[RecallQuestion]) -> Vec<(Topic, Vec<&RecallQuestion>)> {
    let mut groups: Vec<(Topic, Vec<&RecallQuestion>)> = Vec::new();
    for question in questions {
        match groups.iter_mut().find(|(topic, _)| *topic == question.topic) {
            Some((_, members)) => members.push(question),
            None => groups.push((question.topic, vec![question])),
        }
    }
    groups
}

fn render_section(topic: Topic, questions: &[&RecallQuestion]) -> String {
    let mut section = format!("\\section{{Chủ đề: {}}}\n", topic);
    for (idx, question) in questions.iter().enumerate() {
        section.push_str(&format!(
            "\\subsection*{{Câu hỏi {}}}\n{}\n\n",
            idx + 1,
            question.body
        ));
        section.push_str(&format!(
            "\\textit{{Gợi ý ôn tập: {}}}\n\n",
            question.explanation
        ));
        section.push_str("\\rule{\\textwidth}{0.4pt}\n\n");
    }
    section
}

/// Builds the full sheet. An empty question list gives an empty document.
pub fn assemble_recall_document(questions: &[RecallQuestion]) -> String {
    if questions.is_empty() {
        return String::new();
    }
    let mut document = String::from(PREAMBLE);
    for (topic, members) in group_by_topic(questions) {
        document.push_str(&render_section(topic, &members));
    }
    document.push_str(FOOTER);
    document
}
