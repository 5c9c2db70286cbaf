use crate::models::cv::CvTemplate;

pub const DEFAULT_TEMPLATE_ID: &str = "modern-professional";

/// moderncv starter document. The other catalog entries are style or colour
/// substitutions of this one.
pub const BASE_LATEX_TEMPLATE: &str = r"\documentclass[11pt,a4paper,sans]{moderncv}

\moderncvstyle{classic}
\moderncvcolor{blue}

\usepackage[scale=0.85]{geometry}
\usepackage[utf8]{inputenc}

\name{Jane}{Doe}
\title{Site Reliability Engineer}
\address{City}{Country}
\phone[mobile]{+00-000-0000000}
\email{jane@example.com}
\homepage{example.com}
\social[linkedin]{janedoe}
\social[github]{janedoe}

\begin{document}

\makecvtitle

\section{Summary}
Engineer focused on cloud infrastructure, container orchestration and
delivery pipelines. Cares about observable, boring, reliable systems.

\section{Experience}
\cventry{2021--Present}{Senior Platform Engineer}{Example Corp}{Remote}{}{
\begin{itemize}
\item Ran multi-region Kubernetes clusters for customer-facing services
\item Cut median deploy time from 40 to 8 minutes
\item Built the on-call dashboards and alerting rules
\end{itemize}}

\cventry{2018--2021}{Infrastructure Engineer}{Sample Ltd}{City}{}{
\begin{itemize}
\item Moved hand-built servers to Terraform-managed infrastructure
\item Automated environment provisioning
\end{itemize}}

\section{Skills}
\cvitem{Cloud}{AWS, GCP}
\cvitem{Containers}{Docker, Kubernetes, Helm}
\cvitem{IaC}{Terraform, Ansible}
\cvitem{CI/CD}{GitHub Actions, ArgoCD}
\cvitem{Languages}{Rust, Go, Python, Bash}

\section{Education}
\cventry{2014--2018}{B.Sc. in Computer Science}{Some University}{City}{}{}

\end{document}
";

/// Fixed, read-only set of starter documents built once at startup.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<CvTemplate>,
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        let templates = vec![
            template(
                DEFAULT_TEMPLATE_ID,
                "Modern Professional",
                "Clean, modern design suitable for tech professionals",
                "professional",
                BASE_LATEX_TEMPLATE.to_string(),
            ),
            template(
                "minimal-clean",
                "Minimal Clean",
                "Minimalist design with focus on content",
                "minimal",
                BASE_LATEX_TEMPLATE.replace("moderncvstyle{classic}", "moderncvstyle{banking}"),
            ),
            template(
                "academic",
                "Academic",
                "Traditional academic CV format",
                "academic",
                BASE_LATEX_TEMPLATE.replace("moderncvcolor{blue}", "moderncvcolor{black}"),
            ),
        ];
        Self { templates }
    }

    pub fn list(&self) -> &[CvTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&CvTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// The template used to materialise a document on an empty store.
    pub fn default_template(&self) -> &CvTemplate {
        // builtin() always contains the default id
        self.get(DEFAULT_TEMPLATE_ID).unwrap_or(&self.templates[0])
    }
}

fn template(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    source_text: String,
) -> CvTemplate {
    CvTemplate {
        id,
        name,
        description,
        category,
        preview_image: None,
        source_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = TemplateCatalog::builtin();
        let ids: Vec<_> = catalog.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["modern-professional", "minimal-clean", "academic"]);
        assert_eq!(catalog.default_template().id, DEFAULT_TEMPLATE_ID);
        // No route serves preview images.
        assert!(catalog.list().iter().all(|t| t.preview_image.is_none()));
    }

    #[test]
    fn test_variants_differ_from_base() {
        let catalog = TemplateCatalog::builtin();
        let minimal = catalog.get("minimal-clean").unwrap();
        assert!(minimal.source_text.contains(r"\moderncvstyle{banking}"));
        let academic = catalog.get("academic").unwrap();
        assert!(academic.source_text.contains(r"\moderncvcolor{black}"));
        assert!(academic.source_text.contains(r"\moderncvstyle{classic}"));
    }

    #[test]
    fn test_unknown_template() {
        assert!(TemplateCatalog::builtin().get("fancy").is_none());
    }
}
