use std::fmt::Write;

use crate::models::{Language, StudentDataForReport};

const NAME_PLACEHOLDER: &str = "[studentName]";

/// Localised prompt strings for one report language.
pub struct LanguagePack {
    pub prompt_title: &'static str,
    pub summary_instructions: &'static str,
    pub json_instructions: &'static str,
    pub catalog_heading: &'static str,
    pub empty_catalog: &'static str,
    pub closing: &'static str,
    pub overall_assessment: &'static str,
    pub strengths: &'static str,
    pub development_suggestions: &'static str,
    pub recommended_games: &'static str,
    pub action_plan: &'static str,
    pub short_term: &'static str,
    pub medium_term: &'static str,
    pub long_term: &'static str,
    pub future_projection: &'static str,
    pub conclusion: &'static str,
}

static TR: LanguagePack = LanguagePack {
    prompt_title: "Kapsamlı Öğrenci Gelişim Raporu Oluştur",
    summary_instructions: "Aşağıdaki verileri kullanarak [studentName] için öğretmen ve veliler tarafından okunacak, sade ve destekleyici bir gelişim raporu yaz. Rapor; öğrencinin güçlü yönlerini, gelişim önerilerini, uygun oyun önerilerini, kısa-orta-uzun vadeli bir eylem planını ve öğrencinin gelecekteki gelişim potansiyeli üzerine bir yorumu içermelidir. Oyun önerilerini SADECE 'Mevcut Oyunların Listesi' içinden seçmelisin.",
    json_instructions: "Yukarıdaki verileri kullanarak, [studentName] için bir gelişim raporu özeti oluştur. Rapor; öğrencinin güçlü yönlerini, gelişim önerilerini, uygun oyun önerilerini, kısa-orta-uzun vadeli bir eylem planını ve öğrencinin gelecekteki gelişim potansiyeli üzerine bir yorumu içermelidir. Oyun önerilerini SADECE 'allGames' alanındaki mevcut oyunların listesi içinden seçmelisin. Yanıtın SADECE aşağıda belirtilen JSON formatında olmalıdır, başka hiçbir metin, açıklama veya markdown formatı ekleme:",
    catalog_heading: "Mevcut Oyunların Listesi",
    empty_catalog: "Şu anda listelenmiş oyun yok.",
    closing: "Raporu şimdi oluştur.",
    overall_assessment: "Genel Değerlendirme",
    strengths: "Güçlü Yönler",
    development_suggestions: "Gelişim Önerileri",
    recommended_games: "Önerilen Oyunlar",
    action_plan: "Önerilen Eylem Planı",
    short_term: "Kısa Vadeli Hedefler (1-2 Hafta)",
    medium_term: "Orta Vadeli Hedefler (1-2 Ay)",
    long_term: "Uzun Vadeli Hedefler (3-6 Ay)",
    future_projection: "Gelecek Gelişim Yorumu",
    conclusion: "Sonuç",
};

static EN: LanguagePack = LanguagePack {
    prompt_title: "Generate Comprehensive Student Progress Report",
    summary_instructions: "Using the data below, write a clear and encouraging progress report for [studentName] that teachers and parents will read. The report must include the student's strengths, suggestions for development, suitable game recommendations, a short-medium-long term action plan, and a projection about the student's future development potential. You MUST choose game recommendations ONLY from the 'List of Available Games'.",
    json_instructions: "Using the data above, create a progress report summary for [studentName]. The report must include the student's strengths, suggestions for development, suitable game recommendations, a short-medium-long term action plan, and a projection about the student's future development potential. You MUST choose game recommendations ONLY from the list of available games in 'allGames'. Your response MUST be ONLY in the following JSON format, with no other text, explanations, or markdown formatting:",
    catalog_heading: "List of Available Games",
    empty_catalog: "No games are currently listed.",
    closing: "Generate the report now.",
    overall_assessment: "Overall Assessment",
    strengths: "Strengths",
    development_suggestions: "Development Suggestions",
    recommended_games: "Recommended Games",
    action_plan: "Suggested Action Plan",
    short_term: "Short-term Goals (1-2 Weeks)",
    medium_term: "Medium-term Goals (1-2 Months)",
    long_term: "Long-term Goals (3-6 Months)",
    future_projection: "Future Development Projection",
    conclusion: "Conclusion",
};

static ES: LanguagePack = LanguagePack {
    prompt_title: "Generar Informe Completo de Progreso del Estudiante",
    summary_instructions: "Usando los datos siguientes, escribe un informe de progreso claro y alentador para [studentName] que leerán docentes y familias. El informe debe incluir las fortalezas del estudiante, sugerencias para el desarrollo, recomendaciones de juegos adecuados, un plan de acción a corto, mediano y largo plazo, y una proyección sobre el potencial de desarrollo futuro del estudiante. DEBES elegir recomendaciones de juegos SOLO de la 'Lista de Juegos Disponibles'.",
    json_instructions: "Usando los datos anteriores, crea un resumen del informe de progreso para [studentName]. El informe debe incluir las fortalezas del estudiante, sugerencias para el desarrollo, recomendaciones de juegos adecuados, un plan de acción a corto, mediano y largo plazo, y una proyección sobre el potencial de desarrollo futuro del estudiante. DEBES elegir recomendaciones de juegos SOLO de la lista de juegos disponibles en 'allGames'. Tu respuesta DEBE estar SOLO en el siguiente formato JSON, sin ningún otro texto, explicaciones o formato markdown:",
    catalog_heading: "Lista de Juegos Disponibles",
    empty_catalog: "No hay juegos disponibles en este momento.",
    closing: "Genera el informe ahora.",
    overall_assessment: "Evaluación General",
    strengths: "Fortalezas",
    development_suggestions: "Sugerencias de Desarrollo",
    recommended_games: "Juegos Recomendados",
    action_plan: "Plan de Acción Sugerido",
    short_term: "Objetivos a Corto Plazo (1-2 Semanas)",
    medium_term: "Objetivos a Medio Plazo (1-2 Meses)",
    long_term: "Objetivos a Largo Plazo (3-6 Meses)",
    future_projection: "Proyección de Desarrollo Futuro",
    conclusion: "Conclusión",
};

static FR: LanguagePack = LanguagePack {
    prompt_title: "Générer un Rapport Complet sur le Progrès de l'Élève",
    summary_instructions: "En utilisant les données ci-dessous, rédigez un rapport de progression clair et encourageant pour [studentName], destiné aux enseignants et aux parents. Le rapport doit inclure les forces de l'élève, les suggestions de développement, les recommandations de jeux appropriées, un plan d'action à court, moyen et long terme, et une projection sur le potentiel de développement futur de l'élève. Vous DEVEZ choisir les recommandations de jeux SEULEMENT parmi la 'Liste des Jeux Disponibles'.",
    json_instructions: "En utilisant les données ci-dessus, créez un résumé du rapport de progression pour [studentName]. Le rapport doit inclure les forces de l'élève, les suggestions de développement, les recommandations de jeux appropriées, un plan d'action à court, moyen et long terme, et une projection sur le potentiel de développement futur de l'élève. Vous DEVEZ choisir les recommandations de jeux SEULEMENT parmi la liste des jeux disponibles dans 'allGames'. Votre réponse DOIT être SEULEMENT dans le format JSON suivant, sans aucun autre texte, explication ou formatage markdown:",
    catalog_heading: "Liste des Jeux Disponibles",
    empty_catalog: "Aucun jeu n'est actuellement disponible.",
    closing: "Générez le rapport maintenant.",
    overall_assessment: "Évaluation Générale",
    strengths: "Forces",
    development_suggestions: "Suggestions de Développement",
    recommended_games: "Jeux Recommandés",
    action_plan: "Plan d'Action Suggéré",
    short_term: "Objectifs à Court Terme (1-2 Semaines)",
    medium_term: "Objectifs à Moyen Terme (1-2 Mois)",
    long_term: "Objectifs à Long Terme (3-6 Mois)",
    future_projection: "Projection sur le Développement Futur",
    conclusion: "Conclusion",
};

static DE: LanguagePack = LanguagePack {
    prompt_title: "Umfassenden Schülerfortschrittsbericht erstellen",
    summary_instructions: "Verwenden Sie die folgenden Daten, um einen klaren und ermutigenden Fortschrittsbericht für [studentName] zu schreiben, der von Lehrkräften und Eltern gelesen wird. Der Bericht muss die Stärken des Schülers, Entwicklungsvorschläge, geeignete Spielempfehlungen, einen kurz-, mittel- und langfristigen Aktionsplan sowie eine Prognose über das zukünftige Entwicklungspotenzial des Schülers enthalten. Wählen Sie Spielempfehlungen NUR aus der 'Liste der verfügbaren Spiele'.",
    json_instructions: "Verwenden Sie die obigen Daten, um eine Zusammenfassung des Fortschrittsberichts für [studentName] zu erstellen. Der Bericht muss die Stärken des Schülers, Entwicklungsvorschläge, geeignete Spielempfehlungen, einen kurz-, mittel- und langfristigen Aktionsplan sowie eine Prognose über das zukünftige Entwicklungspotenzial des Schülers enthalten. Wählen Sie Spielempfehlungen NUR aus der Liste der verfügbaren Spiele in 'allGames'. Ihre Antwort DARF NUR im folgenden JSON-Format sein, ohne weitere Texte, Erläuterungen oder Markdown-Formatierung:",
    catalog_heading: "Liste der verfügbaren Spiele",
    empty_catalog: "Derzeit sind keine Spiele verfügbar.",
    closing: "Erstellen Sie den Bericht jetzt.",
    overall_assessment: "Gesamtbeurteilung",
    strengths: "Stärken",
    development_suggestions: "Entwicklungsvorschläge",
    recommended_games: "Empfohlene Spiele",
    action_plan: "Vorgeschlagener Aktionsplan",
    short_term: "Kurzfristige Ziele (1-2 Wochen)",
    medium_term: "Mittelfristige Ziele (1-2 Monate)",
    long_term: "Langfristige Ziele (3-6 Monate)",
    future_projection: "Zukünftige Entwicklungsprognose",
    conclusion: "Fazit",
};

pub fn language_pack(language: Language) -> &'static LanguagePack {
    match language {
        Language::Tr => &TR,
        Language::En => &EN,
        Language::Es => &ES,
        Language::Fr => &FR,
        Language::De => &DE,
    }
}

fn joined_or(values: &[String], fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(", ")
    }
}

/// Plain-text digest of the student's metrics embedded in the summary prompt.
pub fn student_data_block(data: &StudentDataForReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "- Name: {}", data.name);
    let _ = writeln!(output, "- Grade: {}", data.grade.as_deref().unwrap_or("N/A"));
    match data.avg_score {
        Some(score) => {
            let _ = writeln!(output, "- Overall Average Score: {score}%");
        }
        None => {
            let _ = writeln!(output, "- Overall Average Score: N/A");
        }
    }
    let _ = writeln!(
        output,
        "- Total Games Played: {}",
        data.games_played.unwrap_or(0)
    );
    let _ = writeln!(
        output,
        "- Identified Strengths: {}",
        joined_or(&data.strengths, "None identified yet.")
    );
    let _ = writeln!(
        output,
        "- Areas for Improvement: {}",
        joined_or(&data.development_areas, "None identified yet.")
    );
    let _ = writeln!(
        output,
        "- Badges: {}",
        joined_or(data.badges.as_deref().unwrap_or_default(), "None.")
    );

    let subjects = data.subject_scores.as_deref().unwrap_or_default();
    if subjects.is_empty() {
        let _ = writeln!(output, "- Subject Scores: N/A");
    } else {
        let scores: Vec<String> = subjects
            .iter()
            .map(|s| format!("{}: {}%", s.subject, s.score))
            .collect();
        let _ = writeln!(output, "- Subject Scores: {}", scores.join(", "));
    }

    let _ = writeln!(output, "- Recent Game Performance and Skills Shown:");
    if data.game_scores.is_empty() {
        let _ = writeln!(output, "  - No recent game data available.");
    } else {
        for game in &data.game_scores {
            let _ = writeln!(
                output,
                "  - Game: {}, Score: {}%, Skills: {}",
                game.game,
                game.score,
                joined_or(&game.skills, "N/A")
            );
        }
    }

    let skills = data.skills.as_deref().unwrap_or_default();
    if skills.is_empty() {
        let _ = writeln!(output, "- Overall Skills: N/A");
    } else {
        let scores: Vec<String> = skills
            .iter()
            .map(|s| format!("{}: {}%", s.skill, s.score))
            .collect();
        let _ = writeln!(output, "- Overall Skills: {}", scores.join(", "));
    }

    output
}

fn game_catalog_block(data: &StudentDataForReport, pack: &LanguagePack) -> String {
    if data.all_games.is_empty() {
        return format!("- {}\n", pack.empty_catalog);
    }

    let mut output = String::new();
    for game in &data.all_games {
        if game.description.trim().is_empty() {
            let _ = writeln!(output, "- {}", game.game_name);
        } else {
            let _ = writeln!(output, "- {}: {}", game.game_name, game.description);
        }
    }
    output
}

/// Free-text prompt for the narrative summary.
pub fn summary_prompt(data: &StudentDataForReport, language: Language) -> String {
    let pack = language_pack(language);
    let mut output = String::new();

    let _ = writeln!(output, "# {}", pack.prompt_title);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{}",
        pack.summary_instructions.replace(NAME_PLACEHOLDER, &data.name)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Student Data:");
    output.push_str(&student_data_block(data));
    let _ = writeln!(output);
    let _ = writeln!(output, "{}:", pack.catalog_heading);
    output.push_str(&game_catalog_block(data, pack));
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", pack.closing);

    output
}

/// Prompt asking for an `AIReport` JSON object, with localised section titles.
pub fn json_prompt(
    data: &StudentDataForReport,
    language: Language,
) -> Result<String, serde_json::Error> {
    let pack = language_pack(language);
    let student_json = serde_json::to_string_pretty(data)?;
    let mut output = String::new();

    let _ = writeln!(output, "# {}", pack.prompt_title);
    let _ = writeln!(output, "Student Data: {student_json}");
    let _ = writeln!(output, "---");
    let _ = writeln!(
        output,
        "{}",
        pack.json_instructions.replace(NAME_PLACEHOLDER, &data.name)
    );
    let _ = writeln!(output, "```json");
    let _ = writeln!(output, "{{");
    let _ = writeln!(
        output,
        r#"  "overallAssessment": {{ "title": "{}", "content": "..." }},"#,
        pack.overall_assessment
    );
    let _ = writeln!(
        output,
        r#"  "strengths": {{ "title": "{}", "content": "...", "items": ["..."] }},"#,
        pack.strengths
    );
    let _ = writeln!(
        output,
        r#"  "developmentSuggestions": {{ "title": "{}", "content": "...", "items": ["..."] }},"#,
        pack.development_suggestions
    );
    let _ = writeln!(
        output,
        r#"  "recommendedGames": {{ "title": "{}", "content": "...", "games": [{{ "name": "...", "reason": "..." }}] }},"#,
        pack.recommended_games
    );
    let _ = writeln!(output, r#"  "actionPlan": {{"#);
    let _ = writeln!(output, r#"    "title": "{}","#, pack.action_plan);
    let _ = writeln!(
        output,
        r#"    "short_term": {{ "title": "{}", "items": ["..."] }},"#,
        pack.short_term
    );
    let _ = writeln!(
        output,
        r#"    "medium_term": {{ "title": "{}", "items": ["..."] }},"#,
        pack.medium_term
    );
    let _ = writeln!(
        output,
        r#"    "long_term": {{ "title": "{}", "items": ["..."] }}"#,
        pack.long_term
    );
    let _ = writeln!(output, "  }},");
    let _ = writeln!(
        output,
        r#"  "futureProjection": {{ "title": "{}", "content": "..." }},"#,
        pack.future_projection
    );
    let _ = writeln!(
        output,
        r#"  "conclusion": {{ "title": "{}", "content": "..." }}"#,
        pack.conclusion
    );
    let _ = writeln!(output, "}}");
    let _ = writeln!(output, "```");

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogGame, GameScore, SubjectScore};

    fn sample_student() -> StudentDataForReport {
        StudentDataForReport {
            name: "Zeynep".to_string(),
            grade: Some("2".to_string()),
            avg_score: Some(78.5),
            games_played: Some(12),
            strengths: vec!["Coordination".to_string(), "Counting".to_string()],
            development_areas: vec![],
            badges: None,
            subject_scores: Some(vec![SubjectScore {
                subject: "Math".to_string(),
                score: 81.0,
            }]),
            game_scores: vec![GameScore {
                game: "Number Hop".to_string(),
                score: 88.0,
                skills: vec![],
            }],
            skills: None,
            all_games: vec![
                CatalogGame {
                    id: 1,
                    game_name: "Number Hop".to_string(),
                    description: "Jump onto the correct answer".to_string(),
                },
                CatalogGame {
                    id: 2,
                    game_name: "Shape Dance".to_string(),
                    description: String::new(),
                },
            ],
        }
    }

    #[test]
    fn data_block_fills_gaps_with_placeholders() {
        let block = student_data_block(&sample_student());
        assert!(block.contains("- Overall Average Score: 78.5%"));
        assert!(block.contains("- Identified Strengths: Coordination, Counting"));
        assert!(block.contains("- Areas for Improvement: None identified yet."));
        assert!(block.contains("- Badges: None."));
        assert!(block.contains("- Subject Scores: Math: 81%"));
        assert!(block.contains("  - Game: Number Hop, Score: 88%, Skills: N/A"));
        assert!(block.contains("- Overall Skills: N/A"));
    }

    #[test]
    fn summary_prompt_embeds_name_and_catalog() {
        let prompt = summary_prompt(&sample_student(), Language::Tr);
        assert!(prompt.starts_with("# Kapsamlı Öğrenci Gelişim Raporu Oluştur"));
        assert!(prompt.contains("Zeynep için"));
        assert!(!prompt.contains(NAME_PLACEHOLDER));
        assert!(prompt.contains("Mevcut Oyunların Listesi:"));
        assert!(prompt.contains("- Number Hop: Jump onto the correct answer"));
        assert!(prompt.contains("- Shape Dance\n"));
    }

    #[test]
    fn empty_catalog_is_stated_explicitly() {
        let mut student = sample_student();
        student.all_games.clear();
        let prompt = summary_prompt(&student, Language::En);
        assert!(prompt.contains("- No games are currently listed."));
    }

    #[test]
    fn json_prompt_uses_localised_titles_and_english_keys() {
        let prompt = json_prompt(&sample_student(), Language::De).unwrap();
        assert!(prompt.contains(r#""overallAssessment": { "title": "Gesamtbeurteilung""#));
        assert!(prompt.contains(r#""short_term": { "title": "Kurzfristige Ziele (1-2 Wochen)""#));
        assert!(prompt.contains(r#""conclusion": { "title": "Fazit""#));
        assert!(prompt.contains(r#""game_name": "Number Hop""#));
        assert!(prompt.contains("```json"));
    }

    #[test]
    fn every_language_has_a_distinct_pack() {
        let titles: Vec<&str> = [
            Language::Tr,
            Language::En,
            Language::Es,
            Language::Fr,
            Language::De,
        ]
        .into_iter()
        .map(|language| language_pack(language).prompt_title)
        .collect();

        for (index, title) in titles.iter().enumerate() {
            assert!(!titles[index + 1..].contains(title));
        }
        assert_eq!(language_pack(Language::from_code("pt")).conclusion, "Conclusion");
    }
}
