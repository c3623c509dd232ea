//! DOCX renderer: writes a tailored resume into a Word template.
//!
//! The template supplies every style; only paragraph contents change.
//! Sections are located by their heading text and filled in order, so a
//! template missing a heading simply keeps that section as-is.

pub mod docx;
pub mod markup;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::models::resume::{ExperienceEntry, ProjectEntry, SkillCategory, TailoredResume};
use crate::models::user::UserProfile;
use docx::{DocumentXml, DocxPackage, Relationships, DOCUMENT_PART, RELS_PART};
use markup::{bold_marked_runs, hyperlink, run, RunStyle};

const FONT_PT: u32 = 10;
const MAX_SKILL_LINES: usize = 7;
const MAX_PROJECTS: usize = 3;
/// 2.45 inches.
const SKILLS_TAB_TWIPS: u32 = 3528;
const DEFAULT_TITLE: &str = "Software Engineer";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid DOCX archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Template is missing part {0}")]
    MissingPart(String),

    #[error("Malformed DOCX package: {0}")]
    Package(String),
}

#[derive(Debug, Clone)]
pub struct Renderer {
    template_path: PathBuf,
}

impl Renderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn template_exists(&self) -> bool {
        self.template_path.is_file()
    }

    /// Renders `resume` to `output`, creating parent directories. Blocking.
    pub fn render(
        &self,
        resume: &TailoredResume,
        profile: &UserProfile,
        output: &Path,
    ) -> Result<PathBuf, RenderError> {
        if !self.template_exists() {
            return Err(RenderError::TemplateMissing(self.template_path.clone()));
        }
        let mut package = DocxPackage::open(&self.template_path)?;
        fill_package(&mut package, resume, profile)?;
        let bytes = package.to_bytes()?;

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(output, bytes).map_err(|source| RenderError::Io {
            path: output.to_path_buf(),
            source,
        })?;

        info!("Rendered DOCX to {}", output.display());
        Ok(output.to_path_buf())
    }
}

fn fill_package(
    package: &mut DocxPackage,
    resume: &TailoredResume,
    profile: &UserProfile,
) -> Result<(), RenderError> {
    let mut doc = DocumentXml::parse(&package.part_str(DOCUMENT_PART)?);
    let mut rels = Relationships::parse(package.part_str(RELS_PART)?);

    let mut filler = TemplateFiller {
        doc: &mut doc,
        rels: &mut rels,
        profile,
    };
    filler.header(resume);
    filler.summary(&resume.summary);
    filler.skills(&resume.skills);
    filler.experience(&resume.experience);
    filler.projects(&resume.projects);

    package.set_part(DOCUMENT_PART, doc.to_xml().into_bytes());
    package.set_part(RELS_PART, rels.into_xml().into_bytes());
    Ok(())
}

struct TemplateFiller<'a> {
    doc: &'a mut DocumentXml,
    rels: &'a mut Relationships,
    profile: &'a UserProfile,
}

impl TemplateFiller<'_> {
    /// Clears paragraph `index` and fills it; out-of-range writes are ignored.
    fn rewrite(&mut self, index: usize, content: &str) -> bool {
        match self.doc.paragraph_mut(index) {
            Some(p) => {
                p.clear();
                p.push(content);
                true
            }
            None => false,
        }
    }

    fn link(&mut self, text: &str, url: &str, style: RunStyle) -> String {
        let rel_id = self.rels.hyperlink(url);
        hyperlink(&rel_id, text, style)
    }

    fn header(&mut self, resume: &TailoredResume) {
        if self.doc.len() < 3 {
            debug!("Template has fewer than 3 paragraphs; leaving header untouched");
            return;
        }

        if let Some(name) = self.profile.display_name() {
            self.rewrite(0, &run(&name, RunStyle::plain()));
        }

        let title = match resume.header.title.trim() {
            "" => DEFAULT_TITLE,
            title => title,
        };
        self.rewrite(1, &run(title, RunStyle::plain()));

        let contact = self.contact_line();
        self.rewrite(2, &contact);
    }

    /// `phone; email; LinkedIn; Portfolio; GitHub;`, skipping absent fields.
    fn contact_line(&mut self) -> String {
        let info = self.profile.contact();
        let size = RunStyle::sized(FONT_PT);
        let mut pieces = Vec::new();

        if let Some(phone) = &info.phone {
            pieces.push(run(phone, size));
        }
        if let Some(email) = &info.email {
            let url = if email.starts_with("mailto:") {
                email.clone()
            } else {
                format!("mailto:{email}")
            };
            let label = email.trim_start_matches("mailto:");
            pieces.push(self.link(label, &url, size));
        }
        for (label, url) in [
            ("LinkedIn", &info.linkedin),
            ("Portfolio", &info.portfolio),
            ("GitHub", &info.github),
        ] {
            if let Some(url) = url {
                pieces.push(self.link(label, url, size));
            }
        }

        let separator = run("; ", RunStyle::plain());
        let mut line = pieces.join(separator.as_str());
        if !pieces.is_empty() {
            line.push_str(&run(";", RunStyle::plain()));
        }
        line
    }

    fn summary(&mut self, summary: &str) {
        if summary.trim().is_empty() {
            return;
        }
        let target = self.doc.find("SUMMARY").map(|i| i + 1).or_else(|| {
            (3..self.doc.len()).find(|&i| {
                self.doc
                    .paragraph(i)
                    .is_some_and(|p| p.text().trim_start().starts_with(DEFAULT_TITLE))
            })
        });
        match target {
            Some(index) => {
                self.rewrite(index, &bold_marked_runs(summary, FONT_PT));
            }
            None => debug!("No summary paragraph in template"),
        }
    }

    fn skills(&mut self, skills: &[SkillCategory]) {
        let Some(heading) = self.doc.find("TECHNICAL SKILLS") else {
            return;
        };
        for (offset, skill) in skills.iter().take(MAX_SKILL_LINES).enumerate() {
            let content = format!(
                "{}{}{}",
                run(&skill.category, RunStyle::sized(FONT_PT).bold()),
                run("\t", RunStyle::plain()),
                run(&skill.items, RunStyle::sized(FONT_PT)),
            );
            let index = heading + 1 + offset;
            if !self.rewrite(index, &content) {
                break;
            }
            if let Some(p) = self.doc.paragraph_mut(index) {
                p.add_left_tab_stop(SKILLS_TAB_TWIPS);
            }
        }
    }

    /// Each entry owns one header paragraph followed by one paragraph per bullet.
    fn experience(&mut self, experience: &[ExperienceEntry]) {
        let Some(heading) = self.doc.find("WORK EXPERIENCE") else {
            return;
        };
        let mut index = heading + 1;
        for entry in experience {
            index += 1;
            for bullet in &entry.bullets {
                if index >= self.doc.len() {
                    return;
                }
                self.rewrite(index, &bold_marked_runs(bullet, FONT_PT));
                index += 1;
            }
        }
    }

    /// `title | tech | GitHub`, then two bullet paragraphs per project.
    fn projects(&mut self, projects: &[ProjectEntry]) {
        let Some(heading) = self.doc.find("PROJECTS") else {
            return;
        };
        let mut index = heading + 1;
        for project in projects.iter().take(MAX_PROJECTS) {
            if index >= self.doc.len() {
                break;
            }
            let line = self.project_line(project);
            self.rewrite(index, &line);
            index += 1;

            for bullet in [&project.bullet1, &project.bullet2] {
                if self.rewrite(index, &bold_marked_runs(bullet, FONT_PT)) {
                    index += 1;
                }
            }
        }
    }

    fn project_line(&mut self, project: &ProjectEntry) -> String {
        let size = RunStyle::sized(FONT_PT);
        let url = self.profile.project_link(&project.title);

        let title = match &url {
            Some(url) => self.link(&project.title, url, size.bold()),
            None => run(&project.title, size.bold()),
        };
        let github = match &url {
            Some(url) => self.link("GitHub", url, size),
            None => run("GitHub", size),
        };
        let separator = run(" | ", RunStyle::plain());

        format!(
            "{title}{separator}{}{separator}{github}",
            run(&project.tech, size.bold().italic())
        )
    }
}
