//! Shell strategy: drive git inside the project's sandbox and push.
//!
//! Every step runs sequentially in the sandbox working directory. The
//! directory's `.git` is always rebuilt from scratch, either from a fresh
//! clone of the backup repository (history kept) or from `git init`.

use super::attempt::{run_attempts, Attempt};
use super::{commit_message, readme, SyncAction, SyncOutcome, SyncRequest, Synchronizer};
use crate::config::{Config, SyncConfig, SyncStrategy};
use crate::error::SyncError;
use crate::github::{repository_name, GitHubClient};
use crate::sandbox::git::{ensure_git, head_sha, shell_quote};
use crate::sandbox::{extract_sandbox_id, Sandbox, SandboxClient};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Entries always present in the backup's `.gitignore`.
const IGNORED: &[&str] = &[
    "node_modules/",
    ".next/",
    ".git/",
    ".npm/",
    "nextjs-app/",
    ".env*",
    "*.log",
    ".wh.*",
    ".bash*",
    ".profile",
    ".sudo*",
    ".gitconfig",
];

/// Paths staged first when they exist; anything else in the working
/// directory only gets in through the broader fallbacks.
const ALLOW_LIST: &[&str] = &[
    "package.json",
    "package-lock.json",
    "tsconfig.json",
    "next.config.ts",
    "components.json",
    "postcss.config.mjs",
    "README.md",
    "app/",
    "components/",
    "hooks/",
    "lib/",
    "public/",
    ".gitignore",
];

const GITIGNORE_PATH: &str = ".gitignore";

/// How the working directory's repository was set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum History {
    /// Cloned from the backup branch.
    Preserved,
    /// `git init`; the backup branch does not exist yet.
    Fresh,
}

pub struct ShellSynchronizer {
    github: Arc<GitHubClient>,
    sandboxes: Arc<dyn SandboxClient>,
    branch: String,
    committer_name: String,
    committer_email: String,
    workdir: String,
    command_timeout_ms: u64,
    grace_ms: u64,
    config: SyncConfig,
}

impl ShellSynchronizer {
    pub fn new(
        github: Arc<GitHubClient>,
        sandboxes: Arc<dyn SandboxClient>,
        config: &Config,
    ) -> Self {
        Self {
            github,
            sandboxes,
            branch: config.github.default_branch.clone(),
            committer_name: config.github.committer_name.clone(),
            committer_email: config.github.committer_email.clone(),
            workdir: config.sandbox.workdir.clone(),
            command_timeout_ms: config.sandbox.command_timeout_ms,
            grace_ms: config.sandbox.request_grace_ms,
            config: config.sync.clone(),
        }
    }

    fn identity_command(&self, scope: &str) -> String {
        format!(
            "git config {scope} user.name {} && git config {scope} user.email {}",
            shell_quote(&self.committer_name),
            shell_quote(&self.committer_email)
        )
    }

    /// Clear stale locks, set the global identity and drop any existing `.git`.
    async fn reset_workdir(&self, sandbox: &Sandbox) -> Result<(), SyncError> {
        let t = self.command_timeout_ms;
        sandbox
            .run_checked(
                "clear git locks",
                &format!(
                    "rm -f .git/index.lock {}",
                    shell_quote(&format!(".git/refs/heads/{}.lock", self.branch))
                ),
                t,
            )
            .await?;
        sandbox
            .run_checked("git config", &self.identity_command("--global"), t)
            .await?;
        sandbox.run_checked("remove .git", "rm -rf .git", t).await?;
        Ok(())
    }

    async fn attach_history(&self, sandbox: &Sandbox, repo: &str) -> Result<History, SyncError> {
        let t = self.command_timeout_ms;

        let exists = self.github.get_repo(repo).await?.is_some();
        if exists && self.github.branch_tip(repo, &self.branch).await?.is_some() {
            let scratch = format!("/tmp/snapsync-clone-{}", uuid::Uuid::new_v4());
            let url = self.github.authenticated_clone_url(repo);
            sandbox
                .run_checked(
                    "git clone",
                    &format!(
                        "git clone --no-checkout --branch {} {} {}",
                        shell_quote(&self.branch),
                        shell_quote(&url),
                        shell_quote(&scratch)
                    ),
                    self.config.clone_timeout_ms,
                )
                .await?;
            sandbox
                .run_checked(
                    "adopt cloned history",
                    &format!(
                        "mv {0}/.git .git && rm -rf {0}",
                        shell_quote(&scratch)
                    ),
                    t,
                )
                .await?;
            sandbox
                .run_checked("git reset", "git reset --mixed -q", t)
                .await?;
            return Ok(History::Preserved);
        }

        let branch = shell_quote(&self.branch);
        run_attempts(
            sandbox,
            "git init",
            &[
                Attempt::new("init with branch", format!("git init -b {branch}"), t),
                Attempt::new(
                    "init then checkout",
                    format!("git init && git checkout -b {branch}"),
                    t,
                ),
            ],
        )
        .await
        .into_result("git init")?;
        // An existing repository without the branch only needs the first push.
        if !exists {
            self.github.create_repo(repo).await?;
        }
        Ok(History::Fresh)
    }

    async fn write_files(&self, sandbox: &Sandbox, request: &SyncRequest) -> Result<(), SyncError> {
        let mut files = readme::files_with_readme(request);
        let existing = match files.get(GITIGNORE_PATH) {
            Some(own) => Some(own.clone()),
            None => match sandbox.read_file(GITIGNORE_PATH).await {
                Ok(current) => Some(current),
                Err(e) => {
                    tracing::debug!(sandbox_id = %sandbox.id(), error = %e, "no .gitignore in sandbox");
                    None
                }
            },
        };
        let ignore = gitignore(existing.as_deref());
        files.insert(GITIGNORE_PATH.to_string(), ignore);

        for (path, content) in &files {
            sandbox.write_file(path, content).await?;
        }
        tracing::debug!(sandbox_id = %sandbox.id(), files = files.len(), "files written");
        Ok(())
    }

    async fn stage(&self, sandbox: &Sandbox, request: &SyncRequest) -> Result<(), SyncError> {
        let t = self.config.add_timeout_ms;
        let attempts = [
            Attempt::new("allow-list", allow_list_command(&request.files), t),
            Attempt::new("working tree", "git add .", t),
            Attempt::new("everything", "git add -A", t),
        ];
        run_attempts(sandbox, "git add", &attempts)
            .await
            .into_result("git add")?;
        Ok(())
    }

    async fn push(&self, sandbox: &Sandbox, history: History) -> Result<(), SyncError> {
        let t = self.config.push_timeout_ms;
        let target = shell_quote(&format!("HEAD:{}", self.branch));
        let attempts = match history {
            History::Preserved => [
                Attempt::new("fast-forward", format!("git push -u origin {target}"), t),
                Attempt::new(
                    "force with lease",
                    format!("git push -u origin {target} --force-with-lease"),
                    t,
                ),
            ],
            History::Fresh => [
                Attempt::new("force", format!("git push -u origin {target} --force"), t),
                Attempt::new(
                    "force without upstream",
                    format!("git push origin {target} --force"),
                    t,
                ),
            ],
        };
        run_attempts(sandbox, "git push", &attempts)
            .await
            .into_result("git push")?;
        Ok(())
    }
}

#[async_trait]
impl Synchronizer for ShellSynchronizer {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::Shell
    }

    async fn synchronize(&self, request: &SyncRequest) -> Result<SyncOutcome, SyncError> {
        let sandbox_id = extract_sandbox_id(&request.sandbox_url).ok_or_else(|| {
            SyncError::Validation(format!(
                "cannot derive a sandbox id from '{}'",
                request.sandbox_url
            ))
        })?;
        let sandbox = Sandbox::connect(self.sandboxes.clone(), sandbox_id, self.workdir.clone())
            .with_grace_ms(self.grace_ms)
            .with_secret(self.github.token());
        let repo = repository_name(&request.project_id);
        let repo_url = self.github.html_url(&repo);
        let t = self.command_timeout_ms;

        ensure_git(&sandbox, self.config.install_timeout_ms).await?;
        self.reset_workdir(&sandbox).await?;
        let history = self.attach_history(&sandbox, &repo).await?;
        sandbox
            .run_checked("git config", &self.identity_command("--local"), t)
            .await?;

        self.write_files(&sandbox, request).await?;
        self.stage(&sandbox, request).await?;

        // Only the index decides; unstaged and untracked files do not count.
        let staged = sandbox
            .run("git diff", "git diff --cached --quiet", t)
            .await?;
        match staged.exit_code {
            0 => {
                return Ok(SyncOutcome {
                    repo_url,
                    action: SyncAction::NoChanges,
                    commit_sha: head_sha(&sandbox, t).await?,
                });
            }
            1 => {}
            _ => return Err(SyncError::tooling("git diff", staged.failure_reason())),
        }

        sandbox
            .run_checked(
                "git commit",
                &format!("git commit -q -m {}", shell_quote(&commit_message(&request.title))),
                t,
            )
            .await?;

        let remote = shell_quote(&self.github.authenticated_clone_url(&repo));
        sandbox
            .run_checked(
                "git remote",
                &format!("git remote add origin {remote} || git remote set-url origin {remote}"),
                t,
            )
            .await?;

        self.push(&sandbox, history).await?;

        Ok(SyncOutcome {
            repo_url,
            action: match history {
                History::Fresh => SyncAction::Created,
                History::Preserved => SyncAction::Synced,
            },
            commit_sha: head_sha(&sandbox, t).await?,
        })
    }
}

/// Project `.gitignore` (if any) followed by every fixed entry it lacks.
fn gitignore(existing: Option<&str>) -> String {
    let existing = existing.unwrap_or_default();
    let present: BTreeSet<&str> = existing.lines().map(str::trim).collect();

    let mut out = existing.trim_end().to_string();
    if !out.is_empty() {
        out.push('\n');
    }
    for entry in IGNORED.iter().filter(|e| !present.contains(*e)) {
        out.push_str(entry);
        out.push('\n');
    }
    out
}

/// Stage the allow-list plus the request's own paths, skipping whatever
/// does not exist. Any `git add` failure fails the attempt.
fn allow_list_command(files: &BTreeMap<String, String>) -> String {
    let paths: BTreeSet<&str> = ALLOW_LIST
        .iter()
        .copied()
        .chain(files.keys().map(String::as_str))
        .collect();
    let quoted = paths
        .into_iter()
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ");
    format!(r#"for p in {quoted}; do if [ -e "$p" ]; then git add -- "$p" || exit 1; fi; done"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitHubConfig;
    use crate::sandbox::testing::{LocalShellClient, ScriptedClient};
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> Config {
        Config {
            github: GitHubConfig {
                token: "ghp_secret".into(),
                api_base: server.uri(),
                ..GitHubConfig::default()
            },
            sync: SyncConfig {
                strategy: SyncStrategy::Shell,
                ..SyncConfig::default()
            },
            ..Config::default()
        }
    }

    fn synchronizer(server: &MockServer, client: Arc<ScriptedClient>) -> ShellSynchronizer {
        let cfg = config(server);
        let github = Arc::new(GitHubClient::new(&cfg.github).unwrap());
        ShellSynchronizer::new(github, client, &cfg)
    }

    fn request() -> SyncRequest {
        SyncRequest {
            project_id: "p1".into(),
            files: BTreeMap::from([("app/page.tsx".to_string(), "<main/>".to_string())]),
            sandbox_url: "https://3000-sbx42.e2b.app".into(),
            title: "Todo".into(),
            fragment_id: None,
        }
    }

    async fn existing_repo(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/backup_admin/project-p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "project-p1",
                "html_url": "https://github.com/backup_admin/project-p1"
            })))
            .mount(server)
            .await;
    }

    async fn existing_branch(server: &MockServer) {
        existing_repo(server).await;
        Mock::given(method("GET"))
            .and(path("/repos/backup_admin/project-p1/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/main",
                "object": {"sha": "tip"}
            })))
            .mount(server)
            .await;
    }

    fn dirty_client() -> Arc<ScriptedClient> {
        let client = Arc::new(ScriptedClient::new());
        client
            .on("git --version", 0, "git version 2.43.0")
            .on("git diff --cached --quiet", 1, "")
            .on("git rev-parse HEAD", 0, "abc123\n");
        client
    }

    #[tokio::test]
    async fn existing_repository_keeps_history() {
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let client = dirty_client();

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert!(report.success, "{report:?}");
        assert_eq!(report.action, Some(SyncAction::Synced));
        assert_eq!(report.commit_sha.as_deref(), Some("abc123"));
        assert_eq!(report.repo_url.as_deref(), Some("https://github.com/backup_admin/project-p1"));

        let rm = client.position("rm -rf .git").unwrap();
        let clone = client.position("git clone --no-checkout").unwrap();
        let commit = client.position("git commit").unwrap();
        let push = client.position("git push").unwrap();
        assert!(rm < clone && clone < commit && commit < push);
        assert!(client.ran("git clone --no-checkout --branch 'main'"));
        assert!(client.ran("git reset --mixed -q"));
        assert!(!client.ran("git init"));
        assert!(!client.ran("--force"));

        let files = client.files();
        assert_eq!(files["/home/user/app/page.tsx"], "<main/>");
        assert!(files["/home/user/README.md"].contains("# Todo"));
        assert!(files["/home/user/.gitignore"].contains("node_modules/"));
    }

    #[tokio::test]
    async fn missing_repository_is_created_and_force_pushed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/backup_admin/project-p1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "project-p1",
                "html_url": "https://github.com/backup_admin/project-p1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let client = dirty_client();

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert_eq!(report.action, Some(SyncAction::Created));
        assert!(client.ran("git init -b 'main'"));
        assert!(client.ran("git push -u origin 'HEAD:main' --force"));
        assert!(!client.ran("git clone"));
    }

    #[tokio::test]
    async fn empty_repository_starts_branch_without_recreating_it() {
        let server = MockServer::start().await;
        existing_repo(&server).await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let client = dirty_client();

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert!(report.success, "{report:?}");
        assert_eq!(report.action, Some(SyncAction::Created));
        assert!(client.ran("git init -b 'main'"));
        assert!(!client.ran("git clone"));
    }

    #[tokio::test]
    async fn failed_reset_aborts_before_commit() {
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let client = dirty_client();
        client.on("git reset", 128, "");

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("git reset"));
        assert!(!client.ran("git commit"));
        assert!(!client.ran("git push"));
    }

    #[tokio::test]
    async fn clean_index_reports_no_changes() {
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let client = Arc::new(ScriptedClient::new());
        client.on("git rev-parse HEAD", 0, "abc123\n");

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert_eq!(report.action, Some(SyncAction::NoChanges));
        assert_eq!(report.commit_sha.as_deref(), Some("abc123"));
        assert!(!client.ran("git commit"));
        assert!(!client.ran("git push"));
    }

    #[tokio::test]
    async fn rejected_push_falls_back_to_lease() {
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let client = dirty_client();
        client.on_times("git push -u origin 'HEAD:main'", 1, "", 1);

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert!(report.success, "{report:?}");
        assert!(client.ran("--force-with-lease"));
    }

    #[tokio::test]
    async fn exhausted_push_fails_without_leaking_token() {
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let client = dirty_client();
        client.on("git push", 1, "");

        let report = synchronizer(&server, client).sync(&request()).await;
        assert!(!report.success);
        let error = report.error.unwrap();
        assert!(error.contains("git push"));
        assert!(!error.contains("ghp_secret"));
        assert_eq!(report.files_count, 1);
    }

    #[tokio::test]
    async fn unparseable_sandbox_url_is_rejected_before_any_command() {
        let server = MockServer::start().await;
        let client = Arc::new(ScriptedClient::new());
        let mut req = request();
        req.sandbox_url = "https://example.com".into();

        let report = synchronizer(&server, client.clone()).sync(&req).await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("sandbox id"));
        assert!(client.commands().is_empty());
    }

    /// A bare backup remote that the token clone URL resolves to, next to a
    /// sandbox working directory and a private HOME.
    struct LocalRepo {
        root: TempDir,
        remote: PathBuf,
        seed: PathBuf,
        workdir: PathBuf,
        home: PathBuf,
    }

    impl LocalRepo {
        /// `None` when the host has no git.
        fn new() -> Option<Self> {
            let has_git = std::process::Command::new("git")
                .arg("--version")
                .output()
                .is_ok_and(|o| o.status.success());
            if !has_git {
                return None;
            }

            let root = TempDir::new().unwrap();
            let remotes = root.path().join("remotes");
            let repo = Self {
                remote: remotes.join("project-p1.git"),
                seed: root.path().join("seed"),
                workdir: root.path().join("work"),
                home: root.path().join("home"),
                root,
            };
            for dir in [&remotes, &repo.seed, &repo.workdir, &repo.home] {
                std::fs::create_dir_all(dir).unwrap();
            }
            std::fs::write(
                repo.home.join(".gitconfig"),
                format!(
                    "[url \"{}/\"]\n\tinsteadOf = https://ghp_secret@github.com/backup_admin/\n",
                    remotes.display()
                ),
            )
            .unwrap();

            let remote = repo.remote.display().to_string();
            repo.git(repo.root.path(), &["init", "-q", "--bare", "-b", "main", &remote]);
            std::fs::write(repo.seed.join("package.json"), "{}").unwrap();
            repo.git(&repo.seed, &["init", "-q", "-b", "main"]);
            repo.git(&repo.seed, &["add", "."]);
            repo.commit(&repo.seed, "seed");
            repo.git(&repo.seed, &["push", "-q", &remote, "main"]);
            Some(repo)
        }

        fn git(&self, dir: &Path, args: &[&str]) -> String {
            let out = std::process::Command::new("git")
                .args(args)
                .current_dir(dir)
                .env("HOME", &self.home)
                .env("GIT_CONFIG_NOSYSTEM", "1")
                .output()
                .unwrap();
            assert!(
                out.status.success(),
                "git {args:?}: {}",
                String::from_utf8_lossy(&out.stderr)
            );
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }

        fn commit(&self, dir: &Path, message: &str) {
            self.git(
                dir,
                &["-c", "user.name=seed", "-c", "user.email=seed@example.com", "commit", "-q", "-m", message],
            );
        }

        fn remote_git(&self, args: &[&str]) -> String {
            self.git(&self.remote, args)
        }

        /// Point the remote's HEAD at an unrelated `master` branch.
        fn diverge_remote_head(&self) {
            let remote = self.remote.display().to_string();
            self.git(&self.seed, &["checkout", "-q", "--orphan", "master"]);
            self.commit(&self.seed, "unrelated");
            self.git(&self.seed, &["push", "-q", &remote, "master"]);
            self.remote_git(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        }

        fn synchronizer(&self, server: &MockServer) -> ShellSynchronizer {
            let mut cfg = config(server);
            cfg.sandbox.workdir = self.workdir.display().to_string();
            let github = Arc::new(GitHubClient::new(&cfg.github).unwrap());
            ShellSynchronizer::new(github, Arc::new(LocalShellClient::new(&self.home)), &cfg)
        }
    }

    #[tokio::test]
    async fn untracked_template_files_do_not_block_no_changes() {
        let Some(repo) = LocalRepo::new() else {
            eprintln!("git not installed, skipping");
            return;
        };
        std::fs::write(repo.workdir.join("package.json"), "{}").unwrap();
        std::fs::write(repo.workdir.join("next-env.d.ts"), "/// <reference types=\"next\" />\n").unwrap();
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let sync = repo.synchronizer(&server);

        let first = sync.sync(&request()).await;
        assert!(first.success, "{first:?}");
        assert_eq!(first.action, Some(SyncAction::Synced));
        let sha = first.commit_sha.clone().unwrap();
        assert_eq!(repo.remote_git(&["rev-parse", "main"]), sha);

        let second = sync.sync(&request()).await;
        assert!(second.success, "{second:?}");
        assert_eq!(second.action, Some(SyncAction::NoChanges));
        assert_eq!(second.commit_sha.as_deref(), Some(sha.as_str()));

        let tracked = repo.remote_git(&["ls-tree", "-r", "--name-only", "main"]);
        assert!(tracked.lines().any(|l| l == "app/page.tsx"));
        assert!(tracked.lines().any(|l| l == "README.md"));
        assert!(!tracked.contains("next-env.d.ts"));
    }

    #[tokio::test]
    async fn clone_follows_backup_branch_not_remote_head() {
        let Some(repo) = LocalRepo::new() else {
            eprintln!("git not installed, skipping");
            return;
        };
        let seeded = repo.remote_git(&["rev-parse", "main"]);
        repo.diverge_remote_head();
        let server = MockServer::start().await;
        existing_branch(&server).await;

        let report = repo.synchronizer(&server).sync(&request()).await;
        assert!(report.success, "{report:?}");
        assert_eq!(report.action, Some(SyncAction::Synced));
        assert_eq!(repo.remote_git(&["rev-parse", "main"]), report.commit_sha.unwrap());
        assert_eq!(repo.remote_git(&["rev-parse", "main~1"]), seeded);
    }

    #[tokio::test]
    async fn sandbox_gitignore_is_merged_when_request_has_none() {
        let server = MockServer::start().await;
        existing_branch(&server).await;
        let client = dirty_client();
        client
            .write_file("sbx42", "/home/user/.gitignore", "/.vercel\nnode_modules/\n")
            .await
            .unwrap();

        let report = synchronizer(&server, client.clone()).sync(&request()).await;
        assert!(report.success, "{report:?}");
        let written = &client.files()["/home/user/.gitignore"];
        assert!(written.starts_with("/.vercel\nnode_modules/\n"));
        assert_eq!(written.matches("node_modules/").count(), 1);
        assert!(written.contains(".env*"));
    }

    #[test]
    fn gitignore_keeps_project_entries() {
        let merged = gitignore(Some("dist/\nnode_modules/\n"));
        assert!(merged.starts_with("dist/\nnode_modules/\n"));
        assert_eq!(merged.matches("node_modules/").count(), 1);
        assert!(merged.contains(".env*"));
        assert_eq!(gitignore(None).lines().count(), IGNORED.len());
    }

    #[test]
    fn allow_list_includes_request_paths() {
        let files = BTreeMap::from([("src/extra.ts".to_string(), String::new())]);
        let cmd = allow_list_command(&files);
        assert!(cmd.contains("'src/extra.ts'"));
        assert!(cmd.contains("'package.json'"));
        assert_eq!(cmd.matches("'README.md'").count(), 1);
    }
}
